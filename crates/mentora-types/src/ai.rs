//! AI completion request/response types for Mentora.
//!
//! These types model the provider-agnostic data shapes for LLM
//! interactions: completion requests, responses, task classification,
//! streaming chunks, and error handling. Vendor-specific wire structs
//! live with the provider adapters, not here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an AI conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an AI conversation.
///
/// Immutable once created; `image_urls` carries optional image references
/// for vision-capable providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            image_urls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            image_urls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            image_urls: Vec::new(),
        }
    }
}

/// Classification of an AI request, carried for analytics and intended to
/// influence model choice.
///
/// The router does not act on this today: provider order is fixed at
/// registration time regardless of task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Teaching,
    Grading,
    Nudge,
    Analysis,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Teaching => write!(f, "teaching"),
            TaskType::Grading => write!(f, "grading"),
            TaskType::Nudge => write!(f, "nudge"),
            TaskType::Analysis => write!(f, "analysis"),
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "teaching" => Ok(TaskType::Teaching),
            "grading" => Ok(TaskType::Grading),
            "nudge" => Ok(TaskType::Nudge),
            "analysis" => Ok(TaskType::Analysis),
            other => Err(format!("invalid task type: '{other}'")),
        }
    }
}

/// Request to an AI provider for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Model override; when `None` each provider picks its default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub task: TaskType,
}

/// Response from an AI provider for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    /// Model identifier the provider actually resolved to.
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl CompletionResponse {
    /// Sum of input and output tokens.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A chunk of a streaming completion.
///
/// Streaming is not truly incremental in this core: providers emit the
/// whole response as a single chunk with `done == true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
}

/// Static capability metadata describing an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub max_tokens: u32,
    pub description: String,
}

/// Errors from AI provider and router operations.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// Non-2xx HTTP response from a vendor, carrying status and body.
    #[error("provider returned http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The vendor answered 2xx but with no usable content.
    #[error("provider returned no content")]
    EmptyResponse,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The router exhausted its fallback chain.
    #[error("all AI providers failed")]
    AllProvidersFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            let s = role.to_string();
            let parsed: MessageRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_task_type_roundtrip() {
        for task in [
            TaskType::Teaching,
            TaskType::Grading,
            TaskType::Nudge,
            TaskType::Analysis,
        ] {
            let s = task.to_string();
            let parsed: TaskType = s.parse().unwrap();
            assert_eq!(task, parsed);
        }
    }

    #[test]
    fn test_task_type_default_is_teaching() {
        assert_eq!(TaskType::default(), TaskType::Teaching);
    }

    #[test]
    fn test_message_role_serde() {
        let role = MessageRole::Assistant;
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: MessageRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MessageRole::Assistant);
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("What is algebra?");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "What is algebra?");
        assert!(msg.image_urls.is_empty());
    }

    #[test]
    fn test_message_serde_skips_empty_images() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("image_urls").is_none());
    }

    #[test]
    fn test_completion_request_defaults() {
        let json = r#"{"messages":[]}"#;
        let req: CompletionRequest = serde_json::from_str(json).unwrap();
        assert!(req.model.is_none());
        assert!(req.max_tokens.is_none());
        assert_eq!(req.task, TaskType::Teaching);
    }

    #[test]
    fn test_total_tokens() {
        let resp = CompletionResponse {
            content: "x".to_string(),
            model: "m".to_string(),
            input_tokens: 120,
            output_tokens: 45,
        };
        assert_eq!(resp.total_tokens(), 165);
    }

    #[test]
    fn test_ai_error_display() {
        let err = AiError::Http {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(
            AiError::AllProvidersFailed.to_string(),
            "all AI providers failed"
        );
    }
}
