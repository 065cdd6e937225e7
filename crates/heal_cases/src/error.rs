//! Error types for the case store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for case store operations.
pub type CaseResult<T> = Result<T, CaseError>;

/// Errors that can occur while loading or writing test cases.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("Case store not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Invalid case store format in file {path}: {message}")]
    InvalidFormat { path: PathBuf, message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
