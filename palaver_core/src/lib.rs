#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Shared types for palaver: wire messages, history entries, prompt
//! templates and the `ChatModel` capability every provider implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod history;
pub mod prompt;

pub use history::{HistoryEntry, HistoryError, HistoryRole, RawHistoryEntry};
pub use prompt::PromptTemplate;

/// Sampling temperature used when a provider config omits one.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Role of a message as sent to a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A single completion request.
///
/// `temperature` overrides the provider's configured default for this call
/// only; the agent uses it to run at temperature zero on a shared client.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub stop: Vec<String>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            stop: Vec::new(),
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Text of all system messages, joined by blank lines.
    ///
    /// Providers whose APIs take the system prompt out-of-band use this.
    #[must_use]
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Anything that can turn an ordered list of messages into a completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<LLMResponse>;

    /// Like [`ChatModel::chat`] but reports text incrementally.
    ///
    /// The returned response always carries the full concatenated content.
    /// Providers without a streaming endpoint report the whole answer as a
    /// single chunk.
    async fn chat_streaming(
        &self,
        request: &ChatRequest,
        on_chunk: &(dyn for<'c> Fn(&'c str) + Send + Sync),
    ) -> anyhow::Result<LLMResponse> {
        let response = self.chat(request).await?;
        on_chunk(&response.content);
        Ok(response)
    }

    fn model_name(&self) -> &str;
}
