//! Command implementations, independent of argument parsing.

pub mod init;
pub mod orchestration;
