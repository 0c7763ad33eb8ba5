use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::process::Command;

/// Identifies the machine and checkout that last wrote the lock file.
///
/// A lock stamped elsewhere may be stale, so a mismatch makes the release
/// consult the remote tag history before choosing the next version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Fingerprint(value.into())
    }

    /// Fingerprint for this host and the given project root.
    pub fn current(project_root: &Path) -> Self {
        let root = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());
        Self::from_parts(&hostname(), &root.to_string_lossy())
    }

    pub fn from_parts(host: &str, root: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(host.as_bytes());
        hasher.update(b"\0");
        hasher.update(root.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Fingerprint(digest[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hostname() -> String {
    let sources: [fn() -> Option<String>; 4] = [
        || std::env::var("HOSTNAME").ok(),
        || std::env::var("COMPUTERNAME").ok(),
        || std::fs::read_to_string("/etc/hostname").ok(),
        hostname_command,
    ];
    first_hostname(sources.iter().map(|source| source()))
}

// macOS has neither /etc/hostname nor an exported HOSTNAME.
fn hostname_command() -> Option<String> {
    let output = Command::new("hostname").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

/// First non-blank candidate, trimmed. Stops pulling candidates once found.
fn first_hostname(candidates: impl Iterator<Item = Option<String>>) -> String {
    candidates
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}
