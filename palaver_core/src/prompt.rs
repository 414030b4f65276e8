//! Chat prompt assembly.
//!
//! A prompt is always laid out as
//! `[system segment] + [history] + [human template]`, independent of the
//! provider it is sent to.

use crate::ChatMessage;

/// Placeholder substituted with the current question.
pub const QUESTION_VARIABLE: &str = "{question}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    system: Option<String>,
    human: String,
}

impl PromptTemplate {
    /// Build a template with an optional system segment.
    ///
    /// A blank system prompt is treated as absent.
    #[must_use]
    pub fn new(system_prompt: Option<String>) -> Self {
        Self {
            system: system_prompt.filter(|s| !s.trim().is_empty()),
            human: QUESTION_VARIABLE.to_string(),
        }
    }

    /// Replace the human template. It should contain `{question}`.
    #[must_use]
    pub fn with_human_template(mut self, template: impl Into<String>) -> Self {
        self.human = template.into();
        self
    }

    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system.as_deref()
    }

    #[must_use]
    pub fn format_question(&self, question: &str) -> String {
        self.human.replace(QUESTION_VARIABLE, question)
    }

    /// Render the full message list for one turn.
    #[must_use]
    pub fn format_messages(&self, history: &[ChatMessage], question: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(system) = &self.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(self.format_question(question)));
        messages
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(None)
    }
}
