//! OpenAI-compatible wire types.
//!
//! Three adapters (OpenAI, Ollama, OpenRouter) speak this request/response
//! shape; only base URL, auth, and extra headers differ. These are HTTP
//! structs, NOT the provider-agnostic types from mentora-types.

use serde::{Deserialize, Serialize};

use mentora_types::ai::{AiError, CompletionResponse, Message};

/// Request body for the chat completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A single message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Response body from the chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: WireUsage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Map neutral messages onto the wire; every role is inlined as-is
/// (OpenAI-compatible endpoints accept a `system` role in the list).
pub fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        })
        .collect()
}

/// Convert a wire response into the neutral shape.
///
/// An empty choice list is an error: fallback should move on to the next
/// provider rather than hand the student an empty reply.
pub fn into_completion(response: ChatCompletionResponse) -> Result<CompletionResponse, AiError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(AiError::EmptyResponse);
    };

    Ok(CompletionResponse {
        content: choice.message.content,
        model: response.model,
        input_tokens: response.usage.prompt_tokens,
        output_tokens: response.usage.completion_tokens,
    })
}
