//! Mock completion service for testing.
//!
//! Returns scripted replies in order and records every conversation it
//! receives, so callers can be tested without network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{LlmError, LlmResult};
use crate::service::CompletionService;
use crate::types::{Completion, Message};

/// Scripted reply for one `complete` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful completion with this text.
    Content(String),
    /// Non-2xx response.
    Status(u16, String),
    /// Connection failure.
    Network(String),
    /// Response without content.
    Empty,
}

impl MockReply {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    fn into_result(self, model: &str) -> LlmResult<Completion> {
        match self {
            Self::Content(content) => Ok(Completion {
                content,
                model: model.to_string(),
            }),
            Self::Status(status, body) => Err(LlmError::Status { status, body }),
            Self::Network(msg) => Err(LlmError::Network(msg)),
            Self::Empty => Err(LlmError::EmptyCompletion),
        }
    }
}

/// Mock completion service.
///
/// Replies cycle once the list is exhausted. With no replies configured,
/// every call returns [`LlmError::EmptyCompletion`].
#[derive(Clone)]
pub struct MockCompletion {
    model: String,
    replies: Arc<RwLock<Vec<MockReply>>>,
    reply_index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<Vec<Message>>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            replies: Arc::new(RwLock::new(Vec::new())),
            reply_index: Arc::new(AtomicUsize::new(0)),
            captured: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a reply for the next call.
    pub fn add_reply(self, reply: MockReply) -> Self {
        self.replies.write().push(reply);
        self
    }

    /// Shorthand for a successful reply.
    pub fn add_content(self, text: impl Into<String>) -> Self {
        self.add_reply(MockReply::content(text))
    }

    /// Replace all replies.
    pub fn with_replies(self, replies: Vec<MockReply>) -> Self {
        *self.replies.write() = replies;
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    /// Conversations received, in call order.
    pub fn get_calls(&self) -> Vec<Vec<Message>> {
        self.captured.read().clone()
    }

    /// Content of the last message of the most recent call.
    pub fn last_prompt(&self) -> Option<String> {
        self.captured
            .read()
            .last()
            .and_then(|m| m.last())
            .map(|m| m.content.clone())
    }

    fn next_reply(&self) -> MockReply {
        let replies = self.replies.read();
        if replies.is_empty() {
            return MockReply::Empty;
        }
        let index = self.reply_index.fetch_add(1, Ordering::SeqCst);
        replies[index % replies.len()].clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, messages: &[Message]) -> LlmResult<Completion> {
        self.captured.write().push(messages.to_vec());

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_reply().into_result(&self.model)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replies_in_order() {
        let mock = MockCompletion::new()
            .add_content("first")
            .add_reply(MockReply::Status(500, "boom".into()));

        let first = mock.complete(&[Message::user("a")]).await.unwrap();
        assert_eq!(first.content, "first");

        let second = mock.complete(&[Message::user("b")]).await;
        assert!(matches!(second, Err(LlmError::Status { status: 500, .. })));

        // Cycles
        let third = mock.complete(&[Message::user("c")]).await.unwrap();
        assert_eq!(third.content, "first");

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.last_prompt().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_mock_without_replies_is_empty() {
        let mock = MockCompletion::new();
        let result = mock.complete(&[Message::user("a")]).await;
        assert!(matches!(result, Err(LlmError::EmptyCompletion)));
    }

    #[tokio::test]
    async fn test_mock_clones_share_state() {
        let mock = MockCompletion::new().add_content("ok");
        let handle = mock.clone();
        mock.complete(&[Message::system("s"), Message::user("u")]).await.unwrap();

        let calls = handle.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
    }
}
