//! Release and sync workflows.
//!
//! These functions hold the sequencing rules between the lock, git, the
//! build, the archive download and the tap. They take their collaborators as
//! trait objects so the whole workflow can run against in-memory fakes.

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::artifact::ArtifactHasher;
use crate::boundary::BoundaryWarning;
use crate::build::BuildRunner;
use crate::config::Config;
use crate::domain::{Fingerprint, Reconciliation, SyncOutcome, VersionBump, VersionLock};
use crate::error::{Result, TapReleaseError};
use crate::formula::{FormulaData, FormulaGenerator};
use crate::git::VersionControl;
use crate::tap::{PublishReport, TapPublisher};
use crate::ui;

/// The `--major/--minor/--patch` flags as given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BumpFlags {
    pub major: bool,
    pub minor: bool,
    pub patch: bool,
}

impl BumpFlags {
    /// The single bump kind selected, `Patch` when none is.
    ///
    /// More than one flag is a usage conflict.
    pub fn resolve(&self) -> Result<VersionBump> {
        let selected: Vec<(&str, VersionBump)> = [
            ("--major", self.major, VersionBump::Major),
            ("--minor", self.minor, VersionBump::Minor),
            ("--patch", self.patch, VersionBump::Patch),
        ]
        .into_iter()
        .filter(|(_, set, _)| *set)
        .map(|(flag, _, kind)| (flag, kind))
        .collect();

        match selected.as_slice() {
            [] => Ok(VersionBump::Patch),
            [(_, kind)] => Ok(*kind),
            _ => {
                let flags: Vec<&str> = selected.iter().map(|(flag, _)| *flag).collect();
                Err(TapReleaseError::usage(format!(
                    "only one bump flag may be given, got {}",
                    flags.join(" ")
                )))
            }
        }
    }
}

/// Arguments for the release workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseArgs {
    pub bump: BumpFlags,

    /// Stop after planning and the clean-tree check
    pub dry_run: bool,
}

/// External systems a release talks to.
pub struct Collaborators<'a> {
    pub vcs: &'a dyn VersionControl,
    pub builder: &'a dyn BuildRunner,
    pub hasher: &'a dyn ArtifactHasher,
    pub publisher: &'a dyn TapPublisher,
}

/// Result of a release run
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub plan: Reconciliation,

    /// The tag that was (or in a dry run, would be) created
    pub tag: String,

    pub sha256: Option<String>,

    pub publish: Option<PublishReport>,

    pub dry_run: bool,
}

/// Run a full release.
///
/// Steps, each only after the previous one succeeded:
/// 1. Resolve the bump flags
/// 2. Load the lock and reconcile it with the remote
/// 3. Require a clean working tree
/// 4. Build
/// 5. Create and push the tag
/// 6. Download the tag's archive and hash it
/// 7. Render the formula and publish it to the tap
/// 8. Record the release in the lock file
///
/// A failure anywhere leaves the lock file as it was.
pub fn run_release(
    args: ReleaseArgs,
    config: &Config,
    lock_path: &Path,
    fingerprint: &Fingerprint,
    collaborators: &Collaborators<'_>,
) -> Result<WorkflowResult> {
    let kind = args.bump.resolve()?;
    let vcs = collaborators.vcs;

    let mut lock = VersionLock::load(lock_path)?;
    let plan = lock.reconcile_with_remote(vcs, kind, fingerprint)?;
    for warning in BoundaryWarning::for_plan(&plan) {
        ui::display_boundary_warning(&warning);
    }
    ui::display_release_plan(&plan);

    if vcs.has_uncommitted_changes()? {
        return Err(TapReleaseError::DirtyWorkingTree);
    }

    let tag = plan.proposed.to_string();
    if args.dry_run {
        ui::display_status("Dry run: nothing was built, tagged or published");
        return Ok(WorkflowResult {
            plan,
            tag,
            sha256: None,
            publish: None,
            dry_run: true,
        });
    }

    ui::display_status(&format!("Building {}...", config.name));
    collaborators
        .builder
        .run(&config.build.command, &config.name)?;
    ui::display_success("Build succeeded");

    ui::display_status(&format!("Creating tag {}...", tag));
    vcs.create_tag(&tag)?;
    ui::display_success(&format!("Pushed tag {}", tag));

    let delay = config.github.archive_delay_secs;
    if delay > 0 {
        ui::display_status(&format!("Waiting {}s for the release archive...", delay));
        thread::sleep(Duration::from_secs(delay));
    }

    let url = config.tarball_url(&tag);
    let sha256 = collaborators.hasher.fetch_and_digest(&url)?;
    ui::display_success(&format!("SHA256: {}", sha256));

    let formula = FormulaGenerator::generate(&FormulaData::from_config(config, &tag, &sha256));
    let message = format!("Update {} to {}", config.name, tag);
    let report = collaborators
        .publisher
        .publish(&config.formula_file_name(), &formula, &message)?;
    ui::display_publish_report(&report);

    let released = lock.commit_release(&plan, sha256.clone(), fingerprint)?;
    if released != tag {
        warn!(released = %released, tag = %tag, "lock recorded a different version than was tagged");
    }
    lock.save(lock_path)?;
    info!(version = %released, "release recorded");

    Ok(WorkflowResult {
        plan,
        tag,
        sha256: Some(sha256),
        publish: Some(report),
        dry_run: false,
    })
}

/// Align the lock file with the remote's latest tag.
///
/// Saves when the lock advanced or was re-stamped; a lock ahead of the
/// remote is left alone.
pub fn run_sync(
    vcs: &dyn VersionControl,
    lock_path: &Path,
    fingerprint: &Fingerprint,
) -> Result<SyncOutcome> {
    let mut lock = VersionLock::load(lock_path)?;
    let remote_latest = vcs.latest_tag()?;
    let outcome = lock.sync(&remote_latest, fingerprint)?;

    if outcome.requires_save() {
        lock.save(lock_path)?;
    }
    ui::display_sync_outcome(&outcome);
    Ok(outcome)
}
