//! Conversation and stored-message types for Mentora.
//!
//! A `Conversation` is the unit of tutoring state: an append-only message
//! log, an optional AI-generated summary of older messages, and the
//! `compacted_at` watermark recording how much of the log that summary
//! covers. At most one conversation per user is active (`ended_at == None`)
//! at any time; the engine owns that invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

pub use crate::ai::MessageRole;

/// Pedagogical state of a conversation.
///
/// Only `teaching` is exercised by the completion core; `quizzing` and
/// `reviewing` are driven by outer curriculum layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    #[default]
    Teaching,
    Quizzing,
    Reviewing,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationState::Teaching => write!(f, "teaching"),
            ConversationState::Quizzing => write!(f, "quizzing"),
            ConversationState::Reviewing => write!(f, "reviewing"),
        }
    }
}

impl FromStr for ConversationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "teaching" => Ok(ConversationState::Teaching),
            "quizzing" => Ok(ConversationState::Quizzing),
            "reviewing" => Ok(ConversationState::Reviewing),
            other => Err(format!("invalid conversation state: '{other}'")),
        }
    }
}

/// A single message persisted within a conversation.
///
/// Messages are immutable once created and strictly ordered by creation
/// time. Assistant messages carry the resolved model and token counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// A plain user message with no model metadata.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            model: None,
            input_tokens: None,
            output_tokens: None,
            created_at: Utc::now(),
        }
    }

    /// An assistant message carrying the resolved model and token counts.
    pub fn assistant(
        content: impl Into<String>,
        model: impl Into<String>,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            model: Some(model.into()),
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            created_at: Utc::now(),
        }
    }
}

/// A tutoring conversation session.
///
/// Invariants:
/// - `0 <= compacted_at <= messages.len()`
/// - a non-empty `summary` implies `compacted_at > 0`
/// - messages are append-only, ordered by creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub state: ConversationState,
    pub messages: Vec<StoredMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Number of leading messages covered by `summary`.
    pub compacted_at: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Create a fresh teaching conversation for the given user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            topic_id: None,
            state: ConversationState::Teaching,
            messages: Vec::new(),
            summary: None,
            compacted_at: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// The messages not yet covered by the summary.
    pub fn uncompacted(&self) -> &[StoredMessage] {
        &self.messages[self.compacted_at.min(self.messages.len())..]
    }

    /// Whether this conversation is still active.
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}
