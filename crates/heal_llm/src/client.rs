//! HTTP adapter for OpenAI-compatible chat completion endpoints.
//!
//! Supports DeepSeek and OpenAI, selected explicitly or via environment variables.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LlmError, LlmResult};
use crate::service::CompletionService;
use crate::types::{Completion, Message, MessageRole};

/// Default request deadline. Repair prompts carry whole scripts and
/// responses take minutes on busy endpoints.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    DeepSeek,
    OpenAI,
}

impl LlmProvider {
    /// Default chat completions endpoint
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::DeepSeek => "https://api.deepseek.com/v1/chat/completions",
            Self::OpenAI => "https://api.openai.com/v1/chat/completions",
        }
    }

    /// Default model name
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek-chat",
            Self::OpenAI => "gpt-4o-mini",
        }
    }

    /// Environment variable holding the API key
    pub fn key_env(&self) -> &'static str {
        match self {
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeepSeek => write!(f, "deepseek"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Connection settings for [`ChatCompletionClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: LlmProvider,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings with the provider's default endpoint and model.
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            endpoint: provider.default_endpoint().to_string(),
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chat completion client that handles API calls
pub struct ChatCompletionClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl ChatCompletionClient {
    /// Create a new client with explicit configuration
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::NotConfigured(config.provider.key_env().to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client from environment variables
    ///
    /// Checks in order:
    /// 1. DEEPSEEK_API_KEY
    /// 2. OPENAI_API_KEY
    ///
    /// `HEAL_LLM_MODEL` overrides the model.
    pub fn from_env() -> LlmResult<Self> {
        let custom_model = std::env::var("HEAL_LLM_MODEL").ok().filter(|m| !m.is_empty());

        for provider in [LlmProvider::DeepSeek, LlmProvider::OpenAI] {
            if let Ok(api_key) = std::env::var(provider.key_env()) {
                if !api_key.is_empty() {
                    let mut config = ClientConfig::new(provider, api_key);
                    if let Some(model) = &custom_model {
                        config = config.model(model.clone());
                    }
                    return Self::new(config);
                }
            }
        }

        Err(LlmError::NotConfigured(
            "DEEPSEEK_API_KEY or OPENAI_API_KEY".to_string(),
        ))
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    /// Get the endpoint
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.config.timeout.as_secs())
        } else {
            LlmError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionService for ChatCompletionClient {
    async fn complete(&self, messages: &[Message]) -> LlmResult<Completion> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
        };

        debug!(
            "Calling {} completion endpoint with {} messages",
            self.config.provider,
            messages.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            warn!("Completion service returned {}", status);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content = parse_completion_body(&body)?;
        Ok(Completion {
            content,
            model: self.config.model.clone(),
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Pull the assistant text out of a chat completions response body.
pub fn parse_completion_body(body: &str) -> LlmResult<String> {
    let result: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("{} in body of {} bytes", e, body.len())))?;

    let choice = result
        .choices
        .iter()
        .find(|c| c.message.role.as_deref() == Some(MessageRole::Assistant.as_str()))
        .or_else(|| result.choices.first())
        .ok_or(LlmError::EmptyCompletion)?;

    match choice.message.content.as_deref() {
        Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
        _ => Err(LlmError::EmptyCompletion),
    }
}

// Wire types
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}
