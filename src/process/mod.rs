//! External process execution.

pub mod runner;

pub use runner::{mkvmerge_version, CommandRunner, RunOutput};
