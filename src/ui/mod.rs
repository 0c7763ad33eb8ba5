//! User interface module - terminal output.
//!
//! - `formatter` - Pure formatting functions
//! - This module - Printing to stdout/stderr

pub mod formatter;

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::domain::{Reconciliation, SyncOutcome};
use crate::tap::PublishReport;

/// Print an error with its context chain and operator hint, if any.
pub fn display_failure(error: &anyhow::Error) {
    eprintln!("{}", formatter::format_failure(error));
}

pub fn display_success(message: &str) {
    println!("{}", formatter::format_success(message));
}

pub fn display_status(message: &str) {
    println!("{}", formatter::format_status(message));
}

pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{}", formatter::format_boundary_warning(warning));
}

pub fn display_release_plan(plan: &Reconciliation) {
    println!("\n{}\n", formatter::format_release_plan(plan));
}

pub fn display_sync_outcome(outcome: &SyncOutcome) {
    println!("{}", formatter::format_sync_outcome(outcome));
}

pub fn display_publish_report(report: &PublishReport) {
    println!("{}", formatter::format_publish_report(report));
}

pub fn display_next_steps(config: &Config, version: &str, lock_file: &str) {
    println!("{}", formatter::format_next_steps(config, version, lock_file));
}
