//! Error types for the completion service adapter.

use std::fmt;

/// Completion service errors
#[derive(Debug)]
pub enum LlmError {
    /// No API key available
    NotConfigured(String),
    /// Request could not be sent or the connection failed
    Network(String),
    /// The request exceeded its deadline
    Timeout(u64),
    /// Non-2xx response
    Status { status: u16, body: String },
    /// Response body was not the expected JSON shape
    MalformedResponse(String),
    /// Response carried no usable content
    EmptyCompletion,
    /// Mock or caller-injected failure
    Other(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(var) => write!(
                f,
                "Completion service not configured. Set {}",
                var
            ),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Timeout(secs) => write!(f, "Completion request timed out after {} seconds", secs),
            Self::Status { status, body } => {
                write!(f, "Completion service returned {}: {}", status, snippet(body))
            }
            Self::MalformedResponse(msg) => write!(f, "Malformed completion response: {}", msg),
            Self::EmptyCompletion => write!(f, "Completion service returned empty content"),
            Self::Other(msg) => write!(f, "Completion error: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

/// Keep error bodies readable in logs.
fn snippet(body: &str) -> String {
    const MAX: usize = 300;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

/// Result type for completion operations
pub type LlmResult<T> = Result<T, LlmError>;
