use crate::domain::version::{latest_version_tag, INITIAL_VERSION};
use crate::error::{Result, TapReleaseError};
use crate::git::VersionControl;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock repository for testing without actual git operations
#[derive(Debug, Default)]
pub struct MockRepository {
    tags: Mutex<BTreeSet<String>>,
    created: Mutex<Vec<String>>,
    dirty: bool,
    remote_unreachable: bool,
    reject_tag_push: bool,
    latest_tag_queries: AtomicUsize,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose remote already carries the given tags
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::new();
        for tag in tags {
            repo.add_tag(tag);
        }
        repo
    }

    pub fn add_tag(&self, name: impl Into<String>) {
        self.lock_tags().insert(name.into());
    }

    /// Report uncommitted changes in the working tree
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Make every remote query fail, as if offline or without a remote
    pub fn set_remote_unreachable(&mut self, unreachable: bool) {
        self.remote_unreachable = unreachable;
    }

    pub fn set_reject_tag_push(&mut self, reject: bool) {
        self.reject_tag_push = reject;
    }

    /// Tags created through [VersionControl::create_tag], in order
    pub fn created_tags(&self) -> Vec<String> {
        self.created
            .lock()
            .map(|created| created.clone())
            .unwrap_or_default()
    }

    /// Number of times the remote's latest tag was queried
    pub fn latest_tag_queries(&self) -> usize {
        self.latest_tag_queries.load(Ordering::SeqCst)
    }

    fn lock_tags(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.tags.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.remote_unreachable {
            return Err(TapReleaseError::remote("mock remote 'origin' is unreachable"));
        }
        Ok(())
    }
}

impl VersionControl for MockRepository {
    fn latest_tag(&self) -> Result<String> {
        self.latest_tag_queries.fetch_add(1, Ordering::SeqCst);
        self.ensure_reachable()?;

        let tags = self.lock_tags();
        let latest = latest_version_tag(tags.iter().map(String::as_str)).unwrap_or(INITIAL_VERSION);
        Ok(latest.to_string())
    }

    fn tag_exists(&self, tag: &str) -> Result<bool> {
        self.ensure_reachable()?;
        Ok(self.lock_tags().contains(tag))
    }

    fn create_tag(&self, tag: &str) -> Result<()> {
        if self.reject_tag_push {
            return Err(TapReleaseError::remote(format!("push of {} rejected", tag)));
        }

        let mut tags = self.lock_tags();
        if !tags.insert(tag.to_string()) {
            return Err(TapReleaseError::TagConflict(tag.to_string()));
        }
        drop(tags);

        if let Ok(mut created) = self.created.lock() {
            created.push(tag.to_string());
        }
        Ok(())
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_repository_default() {
        let repo = MockRepository::default();
        assert_eq!(repo.latest_tag().unwrap(), "v0.0.0");
        assert!(!repo.has_uncommitted_changes().unwrap());
    }

    #[test]
    fn test_mock_repository_latest_tag_is_numeric_max() {
        let repo = MockRepository::with_tags(["v1.9.0", "v1.10.0", "latest"]);
        assert_eq!(repo.latest_tag().unwrap(), "v1.10.0");
        assert_eq!(repo.latest_tag_queries(), 1);
    }

    #[test]
    fn test_mock_repository_tags() {
        let repo = MockRepository::with_tags(["v1.0.0"]);
        assert!(repo.tag_exists("v1.0.0").unwrap());
        assert!(!repo.tag_exists("v2.0.0").unwrap());
    }

    #[test]
    fn test_mock_repository_create_tag_records_and_conflicts() {
        let repo = MockRepository::new();
        repo.create_tag("v0.0.1").unwrap();
        assert_eq!(repo.created_tags(), vec!["v0.0.1".to_string()]);
        assert!(repo.tag_exists("v0.0.1").unwrap());
        assert!(matches!(
            repo.create_tag("v0.0.1"),
            Err(TapReleaseError::TagConflict(_))
        ));
    }

    #[test]
    fn test_mock_repository_unreachable_remote() {
        let mut repo = MockRepository::new();
        repo.set_remote_unreachable(true);
        assert!(matches!(repo.latest_tag(), Err(TapReleaseError::RemoteQuery(_))));
        assert!(repo.tag_exists("v1.0.0").is_err());
    }
}
