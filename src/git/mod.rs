//! Version control abstraction layer
//!
//! The release workflow talks to git only through the [VersionControl] trait,
//! so the version-lock logic can be exercised against an in-memory fake.
//!
//! - [repository::Git2Repository]: real implementation using the `git2` crate
//! - [mock::MockRepository]: in-memory implementation for tests
//!
//! ```rust
//! # use tap_release::git::VersionControl;
//! # fn example<V: VersionControl>(vcs: &V) -> tap_release::Result<()> {
//! let latest = vcs.latest_tag()?;
//! if !vcs.tag_exists("v1.0.0")? {
//!     vcs.create_tag("v1.0.0")?;
//! }
//! # let _ = latest;
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;

/// Queries and mutations the release workflow needs from version control.
///
/// All implementors must be `Send + Sync`.
///
/// Implementations map underlying failures to
/// [crate::error::TapReleaseError]; anything that could not reach the
/// remote must surface as `RemoteQuery` rather than an empty answer.
pub trait VersionControl: Send + Sync {
    /// Latest `vX.Y.Z` tag known to the remote.
    ///
    /// Reads the remote's current tags. Returns `v0.0.0` when the remote holds
    /// no version tags at all.
    fn latest_tag(&self) -> Result<String>;

    /// Whether `tag` exists on the remote. Local-only tags do not count.
    fn tag_exists(&self, tag: &str) -> Result<bool>;

    /// Create an annotated release tag on HEAD and push it to the remote.
    ///
    /// A tag whose push fails is removed again locally.
    fn create_tag(&self, tag: &str) -> Result<()>;

    /// Whether the working tree has modified, staged or untracked files.
    fn has_uncommitted_changes(&self) -> Result<bool>;
}
