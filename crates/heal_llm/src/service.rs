//! Completion service trait.

use async_trait::async_trait;

use crate::error::LlmResult;
use crate::types::{Completion, Message};

/// A request/response text-generation endpoint.
///
/// Implementations make exactly one attempt per call. Deciding whether a
/// failed call is worth repeating belongs to the caller.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete a conversation.
    async fn complete(&self, messages: &[Message]) -> LlmResult<Completion>;

    /// Model identifier used for requests, for logging.
    fn model(&self) -> &str;
}
