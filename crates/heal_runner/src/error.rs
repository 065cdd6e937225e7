//! Error types for the runner module.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while launching tests.
///
/// A test run that completes with failing tests is not an error; it is a
/// [`RunOutcome`](crate::RunOutcome) that did not pass.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Test command not configured")]
    NoCommand,

    #[error("Failed to launch {command}: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("Test execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid script pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Scripts directory not found: {0}")]
    ScriptsDirNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
