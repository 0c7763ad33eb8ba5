//! Persisted release state and its reconciliation with the remote tag history.

use crate::domain::fingerprint::Fingerprint;
use crate::domain::version::{Version, VersionBump, INITIAL_VERSION};
use crate::error::{Result, TapReleaseError};
use crate::git::VersionControl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// File name of the lock document at the project root.
pub const LOCK_FILE: &str = "tap-release.lock";

/// Last released version plus the metadata of that release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionLock {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_release: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl Default for VersionLock {
    fn default() -> Self {
        VersionLock {
            version: INITIAL_VERSION.to_string(),
            last_release: None,
            sha256: None,
            fingerprint: None,
        }
    }
}

/// Why a reconciliation consulted the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTrigger {
    /// The lock was last written by another machine or checkout
    DifferentMachine,
    /// The naively proposed version is already tagged upstream
    TagExists(String),
}

/// Outcome of [VersionLock::reconcile_with_remote].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Version recorded in the lock
    pub current: Version,
    /// Version the release bumps from
    pub baseline: Version,
    /// Version the release will tag
    pub proposed: Version,
    pub kind: VersionBump,
    pub triggers: Vec<SyncTrigger>,
    /// Latest remote tag, if the remote was consulted
    pub remote_latest: Option<Version>,
}

impl Reconciliation {
    /// Whether the baseline moved away from the lock's version.
    pub fn rebased(&self) -> bool {
        self.baseline != self.current
    }
}

/// Outcome of [VersionLock::sync].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Advanced { from: Version, to: Version },
    InSync { version: Version },
    /// Lock is ahead of the remote; nothing was changed
    LocalAhead { local: Version, remote: Version },
}

impl SyncOutcome {
    /// Whether the lock was changed and has to be written back.
    pub fn requires_save(&self) -> bool {
        !matches!(self, SyncOutcome::LocalAhead { .. })
    }
}

impl VersionLock {
    pub fn new(version: impl Into<String>) -> Self {
        VersionLock {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Read the lock file, or start from `v0.0.0` when there is none.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no lock file yet, starting from {}", INITIAL_VERSION);
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let lock: VersionLock = serde_yaml::from_str(&contents).map_err(|e| {
            TapReleaseError::lock(format!("failed to parse {}: {}", path.display(), e))
        })?;
        lock.current_version()?;

        Ok(lock)
    }

    /// Write the lock file via a temp file and rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| TapReleaseError::lock(format!("failed to serialize lock: {}", e)))?;

        let file_name = path
            .file_name()
            .ok_or_else(|| TapReleaseError::lock(format!("invalid lock path: {}", path.display())))?;
        let tmp_path = path.with_file_name(format!(
            ".{}.{}.tmp",
            file_name.to_string_lossy(),
            std::process::id()
        ));

        fs::write(&tmp_path, contents)?;
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!(path = %path.display(), version = %self.version, "lock file saved");
        Ok(())
    }

    pub fn current_version(&self) -> Result<Version> {
        Version::parse(&self.version)
    }

    /// Increment the locked version and stamp the release time.
    pub fn bump(&mut self, kind: VersionBump) -> Result<String> {
        let next = self.current_version()?.bump(kind)?;
        self.version = next.to_string();
        self.last_release = Some(Utc::now());
        Ok(self.version.clone())
    }

    pub fn is_same_machine(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprint.as_deref() == Some(fingerprint.as_str())
    }

    pub fn update_fingerprint(&mut self, fingerprint: &Fingerprint) {
        self.fingerprint = Some(fingerprint.to_string());
    }

    pub fn update_sha256(&mut self, sha256: impl Into<String>) {
        self.sha256 = Some(sha256.into());
    }

    /// Decide the version the next release tags.
    ///
    /// The remote is consulted when the lock came from another machine, or
    /// when the naive bump is already tagged upstream. The baseline is the
    /// greatest of the lock's version and the remote's latest tag. The lock
    /// itself is left untouched, so repeated calls against the same remote
    /// state agree.
    pub fn reconcile_with_remote<V>(
        &self,
        vcs: &V,
        kind: VersionBump,
        fingerprint: &Fingerprint,
    ) -> Result<Reconciliation>
    where
        V: VersionControl + ?Sized,
    {
        let current = self.current_version()?;
        let naive = current.bump(kind)?;

        let mut triggers = Vec::new();
        if !self.is_same_machine(fingerprint) {
            triggers.push(SyncTrigger::DifferentMachine);
        }
        if vcs.tag_exists(&naive.to_string())? {
            triggers.push(SyncTrigger::TagExists(naive.to_string()));
        }

        if triggers.is_empty() {
            return Ok(Reconciliation {
                current,
                baseline: current,
                proposed: naive,
                kind,
                triggers,
                remote_latest: None,
            });
        }

        debug!(?triggers, lock = %current, "consulting remote tags");
        let remote_latest = Version::parse(&vcs.latest_tag()?)?;
        let baseline = current.max(remote_latest);
        let proposed = baseline.bump(kind)?;

        if proposed != naive && vcs.tag_exists(&proposed.to_string())? {
            return Err(TapReleaseError::TagConflict(proposed.to_string()));
        }
        if proposed == naive && triggers.contains(&SyncTrigger::TagExists(naive.to_string())) {
            return Err(TapReleaseError::TagConflict(naive.to_string()));
        }

        if baseline != current {
            info!(lock = %current, remote = %remote_latest, "lock file is behind remote, rebasing");
        }

        Ok(Reconciliation {
            current,
            baseline,
            proposed,
            kind,
            triggers,
            remote_latest: Some(remote_latest),
        })
    }

    /// Align the lock with the remote's latest tag outside of a release.
    ///
    /// Never moves the version backwards: a lock ahead of the remote is
    /// reported and left as is.
    pub fn sync(&mut self, remote_latest: &str, fingerprint: &Fingerprint) -> Result<SyncOutcome> {
        let local = self.current_version()?;
        let remote = Version::parse(remote_latest)?;

        let outcome = match remote.cmp(&local) {
            std::cmp::Ordering::Greater => {
                self.version = remote.to_string();
                self.update_fingerprint(fingerprint);
                SyncOutcome::Advanced {
                    from: local,
                    to: remote,
                }
            }
            std::cmp::Ordering::Equal => {
                self.update_fingerprint(fingerprint);
                SyncOutcome::InSync { version: local }
            }
            std::cmp::Ordering::Less => SyncOutcome::LocalAhead { local, remote },
        };

        debug!(?outcome, "sync finished");
        Ok(outcome)
    }

    /// Record a published release.
    ///
    /// Called only once the formula is in the tap.
    pub fn commit_release(
        &mut self,
        plan: &Reconciliation,
        sha256: impl Into<String>,
        fingerprint: &Fingerprint,
    ) -> Result<String> {
        self.version = plan.baseline.to_string();
        let released = self.bump(plan.kind)?;
        self.update_sha256(sha256);
        self.update_fingerprint(fingerprint);
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use tempfile::TempDir;

    fn here() -> Fingerprint {
        Fingerprint::new("aaaaaaaaaaaaaaaa")
    }

    fn elsewhere() -> Fingerprint {
        Fingerprint::new("bbbbbbbbbbbbbbbb")
    }

    fn stamped(version: &str) -> VersionLock {
        let mut lock = VersionLock::new(version);
        lock.update_fingerprint(&here());
        lock
    }

    #[test]
    fn test_bump_kinds() {
        let cases = [
            (VersionBump::Patch, "v1.2.4"),
            (VersionBump::Minor, "v1.3.0"),
            (VersionBump::Major, "v2.0.0"),
        ];
        for (kind, expected) in cases {
            let mut lock = VersionLock::new("v1.2.3");
            assert_eq!(lock.bump(kind).unwrap(), expected);
            assert_eq!(lock.version, expected);
            assert!(lock.last_release.is_some());
        }
    }

    #[test]
    fn test_bump_malformed_version_does_not_mutate() {
        let mut lock = VersionLock::new("1.2.3");
        let err = lock.bump(VersionBump::Patch).unwrap_err();
        assert!(matches!(err, TapReleaseError::Parse { .. }));
        assert_eq!(lock.version, "1.2.3");
        assert!(lock.last_release.is_none());
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let dir = TempDir::new().unwrap();
        let lock = VersionLock::load(&dir.path().join(LOCK_FILE)).unwrap();
        assert_eq!(lock.version, "v0.0.0");
        assert!(lock.sha256.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCK_FILE);
        let mut lock = stamped("v0.4.1");
        lock.bump(VersionBump::Minor).unwrap();
        lock.update_sha256("deadbeef");
        lock.save(&path).unwrap();

        let loaded = VersionLock::load(&path).unwrap();
        assert_eq!(loaded, lock);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_load_rejects_malformed_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCK_FILE);
        fs::write(&path, "version: 1.2\n").unwrap();
        assert!(matches!(
            VersionLock::load(&path),
            Err(TapReleaseError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_reads_plain_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCK_FILE);
        fs::write(
            &path,
            "version: v1.0.2\nlast_release: 2024-05-01T10:00:00Z\nsha256: abc123\n",
        )
        .unwrap();
        let lock = VersionLock::load(&path).unwrap();
        assert_eq!(lock.version, "v1.0.2");
        assert_eq!(lock.sha256.as_deref(), Some("abc123"));
        assert!(lock.fingerprint.is_none());
    }

    #[test]
    fn test_reconcile_same_machine_no_conflict_skips_remote() {
        let repo = MockRepository::with_tags(["v1.2.3"]);
        let lock = stamped("v1.2.3");
        let plan = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap();
        assert_eq!(plan.proposed, Version::new(1, 2, 4));
        assert!(plan.triggers.is_empty());
        assert!(!plan.rebased());
        assert_eq!(repo.latest_tag_queries(), 0);
    }

    #[test]
    fn test_reconcile_stale_lock_rebases_on_remote() {
        let repo = MockRepository::with_tags(["v1.2.3", "v1.2.4", "v1.3.0"]);
        let lock = stamped("v1.2.3");
        let plan = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap();
        assert_eq!(plan.baseline, Version::new(1, 3, 0));
        assert_eq!(plan.proposed, Version::new(1, 3, 1));
        assert_eq!(plan.triggers, vec![SyncTrigger::TagExists("v1.2.4".into())]);
        assert_eq!(lock.version, "v1.2.3");
    }

    #[test]
    fn test_reconcile_different_machine_takes_numeric_max() {
        let repo = MockRepository::with_tags(["v1.9.0", "v1.10.0"]);
        let lock = VersionLock::new("v1.9.0");
        let plan = lock
            .reconcile_with_remote(&repo, VersionBump::Minor, &here())
            .unwrap();
        assert_eq!(
            plan.triggers,
            vec![
                SyncTrigger::DifferentMachine,
                SyncTrigger::TagExists("v1.10.0".into())
            ]
        );
        assert_eq!(plan.baseline, Version::new(1, 10, 0));
        assert_eq!(plan.proposed, Version::new(1, 11, 0));
    }

    #[test]
    fn test_reconcile_different_machine_keeps_local_when_ahead() {
        let repo = MockRepository::with_tags(["v1.0.0"]);
        let mut lock = VersionLock::new("v1.4.0");
        lock.update_fingerprint(&elsewhere());
        let plan = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap();
        assert_eq!(plan.baseline, Version::new(1, 4, 0));
        assert_eq!(plan.proposed, Version::new(1, 4, 1));
        assert_eq!(plan.remote_latest, Some(Version::new(1, 0, 0)));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let repo = MockRepository::with_tags(["v2.0.0", "v2.0.1", "v2.1.0"]);
        let lock = VersionLock::new("v2.0.0");
        let first = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap();
        let second = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.proposed, Version::new(2, 1, 1));
    }

    #[test]
    fn test_reconcile_surfaces_remote_failure() {
        let mut repo = MockRepository::new();
        repo.set_remote_unreachable(true);
        let lock = VersionLock::new("v1.0.0");
        let err = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap_err();
        assert!(matches!(err, TapReleaseError::RemoteQuery(_)));
    }

    #[test]
    fn test_reconcile_remote_holds_next_patch_only() {
        let repo = MockRepository::with_tags(["v1.0.1", "nightly"]);
        let lock = stamped("v1.0.0");
        let plan = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap();
        assert_eq!(plan.proposed, Version::new(1, 0, 2));
    }

    #[test]
    fn test_sync_adopts_remote_when_ahead() {
        let mut lock = VersionLock::new("v1.2.3");
        let outcome = lock.sync("v1.3.0", &here()).unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Advanced {
                from: Version::new(1, 2, 3),
                to: Version::new(1, 3, 0)
            }
        );
        assert_eq!(lock.version, "v1.3.0");
        assert!(lock.is_same_machine(&here()));
        assert!(outcome.requires_save());
    }

    #[test]
    fn test_sync_equal_only_restamps() {
        let mut lock = VersionLock::new("v1.10.0");
        let outcome = lock.sync("v1.10.0", &here()).unwrap();
        assert!(matches!(outcome, SyncOutcome::InSync { .. }));
        assert_eq!(lock.version, "v1.10.0");
        assert!(lock.is_same_machine(&here()));
    }

    #[test]
    fn test_sync_never_decreases() {
        let mut lock = VersionLock::new("v1.10.0");
        lock.update_fingerprint(&elsewhere());
        let before = lock.clone();
        let outcome = lock.sync("v1.9.0", &here()).unwrap();
        assert!(matches!(outcome, SyncOutcome::LocalAhead { .. }));
        assert!(!outcome.requires_save());
        assert_eq!(lock, before);
    }

    #[test]
    fn test_commit_release_applies_plan() {
        let repo = MockRepository::with_tags(["v1.2.4", "v1.3.0"]);
        let mut lock = stamped("v1.2.3");
        let plan = lock
            .reconcile_with_remote(&repo, VersionBump::Patch, &here())
            .unwrap();
        let released = lock.commit_release(&plan, "cafe", &here()).unwrap();
        assert_eq!(released, "v1.3.1");
        assert_eq!(lock.sha256.as_deref(), Some("cafe"));
        assert!(lock.last_release.is_some());
    }

    /// Remote whose tag listing lags behind its latest-tag answer, as when a
    /// tag lands between the two queries.
    struct LaggingRemote {
        latest: &'static str,
        existing: Vec<&'static str>,
    }

    impl VersionControl for LaggingRemote {
        fn latest_tag(&self) -> Result<String> {
            Ok(self.latest.to_string())
        }

        fn tag_exists(&self, tag: &str) -> Result<bool> {
            Ok(self.existing.contains(&tag))
        }

        fn create_tag(&self, _tag: &str) -> Result<()> {
            Ok(())
        }

        fn has_uncommitted_changes(&self) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_reconcile_rebased_tag_already_taken() {
        let remote = LaggingRemote {
            latest: "v1.3.0",
            existing: vec!["v1.2.4", "v1.3.0", "v1.3.1"],
        };
        let err = stamped("v1.2.3")
            .reconcile_with_remote(&remote, VersionBump::Patch, &here())
            .unwrap_err();
        assert!(matches!(err, TapReleaseError::TagConflict(tag) if tag == "v1.3.1"));
    }

    #[test]
    fn test_reconcile_naive_tag_taken_but_remote_not_ahead() {
        let remote = LaggingRemote {
            latest: "v1.2.3",
            existing: vec!["v1.2.4"],
        };
        let err = stamped("v1.2.3")
            .reconcile_with_remote(&remote, VersionBump::Patch, &here())
            .unwrap_err();
        assert!(matches!(err, TapReleaseError::TagConflict(tag) if tag == "v1.2.4"));

        let err = VersionLock::new("v1.2.3")
            .reconcile_with_remote(&remote, VersionBump::Patch, &elsewhere())
            .unwrap_err();
        assert!(matches!(err, TapReleaseError::TagConflict(tag) if tag == "v1.2.4"));
    }

    #[test]
    fn test_reconcile_different_machine_alone_is_no_conflict() {
        let remote = LaggingRemote {
            latest: "v1.2.3",
            existing: vec!["v1.2.3"],
        };
        let plan = VersionLock::new("v1.2.3")
            .reconcile_with_remote(&remote, VersionBump::Patch, &elsewhere())
            .unwrap();
        assert_eq!(plan.proposed, Version::new(1, 2, 4));
    }
}
