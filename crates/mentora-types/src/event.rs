//! Analytics event types.
//!
//! Events are fire-and-forget: they are queued off the request path and a
//! failure to record one is never surfaced to the student.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Kind of analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MessageSent,
    AiResponse,
    SessionStarted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::MessageSent => write!(f, "message_sent"),
            EventKind::AiResponse => write!(f, "ai_response"),
            EventKind::SessionStarted => write!(f, "session_started"),
        }
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "message_sent" => Ok(EventKind::MessageSent),
            "ai_response" => Ok(EventKind::AiResponse),
            "session_started" => Ok(EventKind::SessionStarted),
            other => Err(format!("invalid event kind: '{other}'")),
        }
    }
}

/// An analytics event tied to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub conversation_id: Uuid,
    pub user_id: String,
    pub kind: EventKind,
    /// Free-form key/value payload (model name, token counts, channel, ...).
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        kind: EventKind,
        conversation_id: Uuid,
        user_id: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            conversation_id,
            user_id: user_id.into(),
            kind,
            data,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_roundtrip() {
        for kind in [
            EventKind::MessageSent,
            EventKind::AiResponse,
            EventKind::SessionStarted,
        ] {
            let s = kind.to_string();
            let parsed: EventKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_event_kind_serde() {
        let json = serde_json::to_string(&EventKind::AiResponse).unwrap();
        assert_eq!(json, "\"ai_response\"");
    }

    #[test]
    fn test_event_new_stamps_time() {
        let event = Event::new(
            EventKind::SessionStarted,
            Uuid::now_v7(),
            "user-1",
            serde_json::json!({"channel": "telegram"}),
        );
        assert_eq!(event.kind, EventKind::SessionStarted);
        assert_eq!(event.data["channel"], "telegram");
        assert!(event.created_at <= Utc::now());
    }
}
