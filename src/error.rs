//! Error types for the mkvmerge batch runner.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Inspection error: {0}")]
    Inspect(#[from] InspectError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),
}

/// Configuration loading and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Configuration has {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

/// Errors raised while turning a command line into a batch of jobs.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Command line rejected with {error_count} error(s)")]
    InvalidCommand { error_count: usize },

    #[error("Batch index {index} out of range (batch size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("Expected {expected} output name(s), got {actual}")]
    RenameMismatch { expected: usize, actual: usize },

    #[error("mkvmerge not found on this system")]
    MkvmergeNotFound,
}

/// Media track inspection errors.
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to run '{command}': {message}")]
    CommandFailed { command: String, message: String },

    #[error("Failed to parse identification of '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("'{path}' is not a recognized media file")]
    Unrecognized { path: PathBuf },
}

/// Process execution errors.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Could not split command line: {0}")]
    BadCommandLine(String),

    #[error("Invalid regular expression: {0}")]
    BadRegex(#[from] regex::Error),

    #[error("Process spawn failed: {0}")]
    SpawnFailed(String),

    #[error("mkvmerge failed with exit code {code}")]
    MkvmergeFailed { code: i32 },
}
