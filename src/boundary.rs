use std::fmt;

use crate::domain::{Reconciliation, SyncTrigger, Version};

/// Non-fatal situations the operator should know about.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// The lock was written by another machine or checkout
    DifferentMachine,
    /// The version the lock would produce is already tagged upstream
    ProposedTagExists { tag: String },
    /// The lock moved to the remote's latest tag before bumping
    RebasedOnRemote { lock: Version, remote: Version },
    /// The lock is ahead of every remote tag, e.g. an unpushed release
    LockAheadOfRemote { local: Version, remote: Version },
}

impl BoundaryWarning {
    pub fn from_trigger(trigger: &SyncTrigger) -> Self {
        match trigger {
            SyncTrigger::DifferentMachine => BoundaryWarning::DifferentMachine,
            SyncTrigger::TagExists(tag) => BoundaryWarning::ProposedTagExists { tag: tag.clone() },
        }
    }

    /// Everything worth telling the operator about a release plan.
    pub fn for_plan(plan: &Reconciliation) -> Vec<Self> {
        let mut warnings: Vec<Self> = plan.triggers.iter().map(Self::from_trigger).collect();
        if let Some(remote) = plan.remote_latest {
            if remote > plan.current {
                warnings.push(BoundaryWarning::RebasedOnRemote {
                    lock: plan.current,
                    remote,
                });
            }
        }
        warnings
    }
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::DifferentMachine => {
                write!(f, "Different machine detected, syncing with remote")
            }
            BoundaryWarning::ProposedTagExists { tag } => {
                write!(f, "Tag {} already exists, syncing with remote", tag)
            }
            BoundaryWarning::RebasedOnRemote { lock, remote } => {
                write!(f, "Lock file ({}) is behind remote ({})", lock, remote)
            }
            BoundaryWarning::LockAheadOfRemote { local, remote } => {
                write!(
                    f,
                    "Lock file ({}) is ahead of remote ({}); left unchanged",
                    local, remote
                )
            }
        }
    }
}
