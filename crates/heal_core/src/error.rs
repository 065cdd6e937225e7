//! Error types for the core module.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that stop a run.
///
/// Problems with a single candidate script (service failures, unusable
/// content, failing tests) are not errors; they are recorded in the
/// run summary.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    #[error("Case store error: {0}")]
    Cases(#[from] heal_cases::CaseError),

    #[error("Script artifact error on {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No test case for script {0}")]
    Correlation(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Runner error: {0}")]
    Runner(#[from] heal_runner::RunnerError),

    #[error("Completion service error: {0}")]
    Completion(#[from] heal_llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Whether the error comes from reading or writing the workspace.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            Self::Cases(_) | Self::Artifact { .. } | Self::Report { .. } | Self::Io(_)
        )
    }
}
