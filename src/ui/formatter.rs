//! Pure formatting functions for UI output.
//!
//! Everything here builds strings; printing lives in the parent module.

use console::style;

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::domain::{Reconciliation, SyncOutcome};
use crate::error::TapReleaseError;
use crate::tap::PublishReport;

pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red().bold(), message)
}

pub fn format_hint(hint: &str) -> String {
    format!("  {} {}", style("hint:").cyan(), hint)
}

/// Error with its context chain, plus a hint line for known failures.
pub fn format_failure(error: &anyhow::Error) -> String {
    let mut text = format_error(&format!("{:#}", error));
    if let Some(hint) = error.downcast_ref::<TapReleaseError>().and_then(TapReleaseError::hint) {
        text.push('\n');
        text.push_str(&format_hint(hint));
    }
    text
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", style("✓").green(), message)
}

pub fn format_status(message: &str) -> String {
    format!("{} {}", style("→").yellow(), message)
}

pub fn format_boundary_warning(warning: &BoundaryWarning) -> String {
    format!("{} {}", style("⚠ WARNING:").yellow(), warning)
}

/// Summary of the version a release will tag and where it came from.
///
/// Shows the lock's version, the remote's latest tag when it was consulted,
/// the baseline if it differs from the lock, and the proposed tag.
pub fn format_release_plan(plan: &Reconciliation) -> String {
    let mut lines = vec![style("Release plan:").bold().to_string()];
    lines.push(format!("  Lock:     {}", plan.current));
    if let Some(remote) = plan.remote_latest {
        lines.push(format!("  Remote:   {}", remote));
    }
    if plan.rebased() {
        lines.push(format!("  Baseline: {}", plan.baseline));
    }
    lines.push(format!(
        "  Release:  {} ({} bump)",
        style(plan.proposed).green(),
        plan.kind
    ));
    lines.join("\n")
}

pub fn format_sync_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Advanced { from, to } => {
            format_success(&format!("Lock file advanced from {} to {}", from, to))
        }
        SyncOutcome::InSync { version } => {
            format_success(&format!("Lock file already matches remote ({})", version))
        }
        SyncOutcome::LocalAhead { local, remote } => {
            format_boundary_warning(&BoundaryWarning::LockAheadOfRemote {
                local: *local,
                remote: *remote,
            })
        }
    }
}

pub fn format_publish_report(report: &PublishReport) -> String {
    if report.changed {
        format_success(&format!(
            "Published {} ({} -> {} formulas)",
            report.path.display(),
            report.formulas_before,
            report.formulas_after
        ))
    } else {
        format_status(&format!("{} already up to date in tap", report.path.display()))
    }
}

/// What the operator does after a release
pub fn format_next_steps(config: &Config, version: &str, lock_file: &str) -> String {
    format!(
        "\n{}\n  git add {lock} && git commit -m \"Release {version}\" && git push\n  {install}",
        style("Next steps:").bold(),
        lock = lock_file,
        version = version,
        install = config.install_hint(),
    )
}
