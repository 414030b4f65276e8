//! Chat sessions over a single model.
//!
//! A session owns its message list. Each successful `ask` appends the
//! question and the answer together; a failed one appends nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use palaver_core::{ChatMessage, ChatModel, ChatRequest, HistoryEntry, PromptTemplate};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SessionError;

/// A conversation with one model.
pub struct ChatSession {
    id: Uuid,
    provider: Arc<dyn ChatModel>,
    template: Arc<PromptTemplate>,
    messages: Vec<ChatMessage>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub(crate) fn new(
        provider: Arc<dyn ChatModel>,
        template: Arc<PromptTemplate>,
        seed: Vec<HistoryEntry>,
    ) -> Self {
        let now = Utc::now();
        let session = Self {
            id: Uuid::now_v7(),
            provider,
            template,
            messages: seed.iter().map(HistoryEntry::to_message).collect(),
            created_at: now,
            updated_at: now,
        };
        debug!(
            "Started session {} with {} seed messages",
            session.id,
            session.messages.len()
        );
        session
    }

    /// Ask a question and wait for the full answer.
    pub async fn ask(&mut self, question: &str) -> Result<String, SessionError> {
        let request = self.request_for(question);
        let turn = self.messages.len() / 2 + 1;
        info!(
            "Processing turn {turn} for session {} on {}",
            self.id,
            self.provider.model_name()
        );

        let response = match self.provider.chat(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Session {} ask failed: {e:#}", self.id);
                return Err(SessionError::Provider(e));
            }
        };
        self.commit(question, response.content)
    }

    /// Ask a question, reporting the answer as it is generated.
    ///
    /// History is only touched once the whole answer has arrived.
    pub async fn ask_streaming(
        &mut self,
        question: &str,
        on_chunk: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<String, SessionError> {
        let request = self.request_for(question);
        info!(
            "Streaming turn for session {} on {}",
            self.id,
            self.provider.model_name()
        );

        let response = match self.provider.chat_streaming(&request, on_chunk).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Session {} streaming ask failed: {e:#}", self.id);
                return Err(SessionError::Provider(e));
            }
        };
        self.commit(question, response.content)
    }

    fn request_for(&self, question: &str) -> ChatRequest {
        ChatRequest::new(self.template.format_messages(&self.messages, question))
    }

    pub(crate) fn commit(&mut self, question: &str, answer: String) -> Result<String, SessionError> {
        if answer.trim().is_empty() {
            warn!("Session {} got an empty answer", self.id);
            return Err(SessionError::EmptyResponse);
        }
        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::assistant(answer.clone()));
        self.updated_at = Utc::now();
        Ok(answer)
    }

    pub(crate) fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub(crate) fn provider(&self) -> &Arc<dyn ChatModel> {
        &self.provider
    }

    pub(crate) fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Snapshot of the conversation in history form.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter_map(HistoryEntry::from_message)
            .collect()
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A session that several tasks can hold.
///
/// A second `ask` while one is in flight fails with
/// [`SessionError::Busy`] instead of waiting.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<ChatSession>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(session: ChatSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn ask(&self, question: &str) -> Result<String, SessionError> {
        let mut session = self.inner.try_lock().map_err(|_| SessionError::Busy)?;
        session.ask(question).await
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().await.history()
    }
}
