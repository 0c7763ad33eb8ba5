//! Domain logic - release versioning rules independent of git and the network

pub mod fingerprint;
pub mod lock;
pub mod version;

pub use fingerprint::Fingerprint;
pub use lock::{Reconciliation, SyncOutcome, SyncTrigger, VersionLock, LOCK_FILE};
pub use version::{compare_versions, Version, VersionBump};
