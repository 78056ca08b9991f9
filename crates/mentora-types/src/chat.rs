//! Chat-adapter boundary types.
//!
//! The core accepts an `InboundMessage` from any channel adapter and
//! returns plain response text. Wire-protocol specifics (polling, webhooks,
//! message splitting, markdown rendering) belong to the adapters.

use serde::{Deserialize, Serialize};

/// A message received from a messaging channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel the message arrived on (e.g., "telegram", "whatsapp").
    pub channel: String,
    /// Channel-scoped user identifier.
    pub user_id: String,
    pub text: String,
    /// Text of the message being replied to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_text: Option<String>,
    /// Reference to an attached image, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Sender's language code as reported by the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl InboundMessage {
    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }

    pub fn has_reply(&self) -> bool {
        self.reply_to_text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let msg = InboundMessage {
            channel: "telegram".to_string(),
            user_id: "123".to_string(),
            text: "hi".to_string(),
            ..Default::default()
        };
        assert!(!msg.has_image());
        assert!(!msg.has_reply());

        let msg = InboundMessage {
            reply_to_text: Some("Step 2".to_string()),
            image_url: Some("file-id-9".to_string()),
            ..msg
        };
        assert!(msg.has_image());
        assert!(msg.has_reply());
    }

    #[test]
    fn test_empty_reply_text_is_not_a_reply() {
        let msg = InboundMessage {
            reply_to_text: Some(String::new()),
            ..Default::default()
        };
        assert!(!msg.has_reply());
    }

    #[test]
    fn test_deserialize_minimal() {
        let json = r#"{"channel":"telegram","user_id":"42","text":"hello"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.user_id, "42");
        assert!(msg.first_name.is_none());
    }
}
