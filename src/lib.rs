pub mod artifact;
pub mod boundary;
pub mod build;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod formula;
pub mod git;
pub mod tap;
pub mod telemetry;
pub mod ui;

pub use error::{Result, TapReleaseError};
