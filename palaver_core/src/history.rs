//! Conversation history entries as seen by callers.
//!
//! Callers own persistence: they seed a session with entries and read them
//! back out. Only three speakers exist at this boundary. Anything else
//! arriving from external input is rejected rather than coerced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ChatMessage, Role};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Unknown history role: {0:?} (expected human, ai or system)")]
    UnknownRole(String),
}

/// Speaker of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    Human,
    Ai,
    System,
}

impl HistoryRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
            Self::System => "system",
        }
    }

    /// Map a wire role back to a history role. Tool messages have no
    /// history counterpart.
    #[must_use]
    pub const fn from_role(role: Role) -> Option<Self> {
        match role {
            Role::User => Some(Self::Human),
            Role::Assistant => Some(Self::Ai),
            Role::System => Some(Self::System),
            Role::Tool => None,
        }
    }
}

impl From<HistoryRole> for Role {
    fn from(role: HistoryRole) -> Self {
        match role {
            HistoryRole::Human => Self::User,
            HistoryRole::Ai => Self::Assistant,
            HistoryRole::System => Self::System,
        }
    }
}

impl FromStr for HistoryRole {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "ai" => Ok(Self::Ai),
            "system" => Ok(Self::System),
            other => Err(HistoryError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for HistoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated entry as it arrives from JSON.
///
/// `type` is accepted as an alias for `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHistoryEntry {
    #[serde(alias = "type")]
    pub role: String,
    pub message: String,
}

impl RawHistoryEntry {
    pub fn new(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            message: message.into(),
        }
    }
}

/// One validated turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHistoryEntry")]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub message: String,
}

impl HistoryEntry {
    pub fn new(role: HistoryRole, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
        }
    }

    pub fn human(message: impl Into<String>) -> Self {
        Self::new(HistoryRole::Human, message)
    }

    pub fn ai(message: impl Into<String>) -> Self {
        Self::new(HistoryRole::Ai, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(HistoryRole::System, message)
    }

    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.role.into(), self.message.clone())
    }

    /// Convert a wire message, dropping roles with no history counterpart.
    #[must_use]
    pub fn from_message(message: &ChatMessage) -> Option<Self> {
        HistoryRole::from_role(message.role).map(|role| Self::new(role, message.content.clone()))
    }
}

impl TryFrom<RawHistoryEntry> for HistoryEntry {
    type Error = HistoryError;

    fn try_from(raw: RawHistoryEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            role: raw.role.parse()?,
            message: raw.message,
        })
    }
}

impl From<HistoryEntry> for RawHistoryEntry {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            role: entry.role.as_str().to_string(),
            message: entry.message,
        }
    }
}
