//! Chat turn handler: inbound message in, response text out.
//!
//! This is the whole adapter contract -- message splitting, markdown
//! rendering, and platform specifics live with the channel adapters that
//! call this endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use mentora_types::chat::InboundMessage;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for a chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default = "default_channel")]
    pub channel: String,
    pub user_id: String,
    pub text: String,
    #[serde(default)]
    pub reply_to_text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_channel() -> String {
    "api".to_string()
}

/// Response body for a chat turn.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// `POST /api/v1/messages`
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.user_id.is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    if request.text.is_empty() {
        return Err(AppError::Validation("text is required".to_string()));
    }

    let inbound = InboundMessage {
        channel: request.channel,
        user_id: request.user_id,
        text: request.text,
        reply_to_text: request.reply_to_text,
        image_url: request.image_url,
        username: request.username,
        first_name: request.first_name,
        last_name: request.last_name,
        language: request.language,
    };

    let reply = state.engine.process_message(&inbound).await;
    Ok(Json(ChatResponse { reply }))
}
