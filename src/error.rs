use thiserror::Error;

/// Unified error type for tap-release operations
#[derive(Error, Debug)]
pub enum TapReleaseError {
    #[error("Version parsing error: '{input}' {reason}")]
    Parse { input: String, reason: String },

    #[error("Usage conflict: {0}")]
    UsageConflict(String),

    #[error("Remote query failed: {0}")]
    RemoteQuery(String),

    #[error("Uncommitted changes detected, clean working directory required")]
    DirtyWorkingTree,

    #[error("Tag error: {0} already exists")]
    TagConflict(String),

    #[error("Checksum failed for {url}: {reason}")]
    Checksum { url: String, reason: String },

    #[error(
        "Publish safety violation: tap formula count would drop from {before} to {after}"
    )]
    PublishSafetyViolation { before: usize, after: usize },

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock file error: {0}")]
    Lock(String),

    #[error("Tap error: {0}")]
    Tap(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in tap-release
pub type Result<T> = std::result::Result<T, TapReleaseError>;

impl TapReleaseError {
    /// Create a version parse error for the given input
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        TapReleaseError::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        TapReleaseError::UsageConflict(msg.into())
    }

    /// Create a remote query error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        TapReleaseError::RemoteQuery(msg.into())
    }

    pub fn checksum(url: impl Into<String>, reason: impl Into<String>) -> Self {
        TapReleaseError::Checksum {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn build(msg: impl Into<String>) -> Self {
        TapReleaseError::Build(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        TapReleaseError::Config(msg.into())
    }

    pub fn lock(msg: impl Into<String>) -> Self {
        TapReleaseError::Lock(msg.into())
    }

    pub fn tap(msg: impl Into<String>) -> Self {
        TapReleaseError::Tap(msg.into())
    }

    /// Operator-facing advice for failures that leave the release half done.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TapReleaseError::Checksum { .. } => Some(
                "The release tag was already pushed and is not rolled back. \
                 Check the archive URL, then publish the formula manually or delete the tag and retry.",
            ),
            TapReleaseError::PublishSafetyViolation { .. } => Some(
                "Nothing was pushed to the tap. Inspect the tap repository before retrying.",
            ),
            TapReleaseError::DirtyWorkingTree => {
                Some("Commit or stash your changes, then run the release again.")
            }
            TapReleaseError::RemoteQuery(_) => {
                Some("The lock file was not modified. Check network access and the git remote.")
            }
            _ => None,
        }
    }
}
