//! # heal_llm - Completion service adapter for selfheal
//!
//! This crate wraps the text-generation endpoint used to repair and
//! generate browser test scripts:
//! - [`CompletionService`] trait for one-shot chat completions
//! - [`ChatCompletionClient`] for OpenAI-compatible HTTP APIs (DeepSeek, OpenAI)
//! - [`MockCompletion`] for tests
//!
//! ## Usage
//!
//! ```no_run
//! use heal_llm::{ChatCompletionClient, CompletionService, Message};
//!
//! # async fn demo() -> heal_llm::LlmResult<()> {
//! let client = ChatCompletionClient::from_env()?;
//! let reply = client
//!     .complete(&[Message::system("You fix tests."), Message::user("...")])
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod mock;
pub mod service;
pub mod types;

pub use client::{parse_completion_body, ChatCompletionClient, ClientConfig, LlmProvider, DEFAULT_TIMEOUT_SECS};
pub use error::{LlmError, LlmResult};
pub use mock::{MockCompletion, MockReply};
pub use service::CompletionService;
pub use types::{Completion, Message, MessageRole};
