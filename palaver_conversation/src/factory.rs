use std::sync::Arc;

use palaver_config::ModelConfig;
use palaver_core::{ChatModel, HistoryEntry, HistoryError, PromptTemplate, RawHistoryEntry};

use crate::error::SessionError;
use crate::session::ChatSession;

/// Per-model session settings.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub system_prompt: Option<String>,
}

impl SessionSettings {
    #[must_use]
    pub fn from_model_config(config: &ModelConfig) -> Self {
        Self {
            system_prompt: config.system_prompt().map(str::to_string),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Starts sessions that share one model client and one prompt template.
#[derive(Clone)]
pub struct SessionFactory {
    provider: Arc<dyn ChatModel>,
    template: Arc<PromptTemplate>,
}

impl SessionFactory {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatModel>, settings: SessionSettings) -> Self {
        Self {
            provider,
            template: Arc::new(PromptTemplate::new(settings.system_prompt)),
        }
    }

    /// Start a session seeded with an already validated history.
    #[must_use]
    pub fn start(&self, seed: Vec<HistoryEntry>) -> ChatSession {
        ChatSession::new(Arc::clone(&self.provider), Arc::clone(&self.template), seed)
    }

    /// Start a session from untyped history, e.g. a file written earlier.
    ///
    /// Fails on the first entry whose role is not `human`, `ai` or
    /// `system`; no session is created in that case.
    pub fn resume(&self, seed: Vec<RawHistoryEntry>) -> Result<ChatSession, SessionError> {
        Ok(self.start(validate_history(seed)?))
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn ChatModel> {
        &self.provider
    }

    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.template.system_prompt()
    }
}

pub(crate) fn validate_history(
    seed: Vec<RawHistoryEntry>,
) -> Result<Vec<HistoryEntry>, SessionError> {
    seed.into_iter()
        .enumerate()
        .map(|(index, raw)| {
            HistoryEntry::try_from(raw)
                .map_err(|HistoryError::UnknownRole(role)| SessionError::UnknownRole { index, role })
        })
        .collect()
}
