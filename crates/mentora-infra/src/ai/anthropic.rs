//! Anthropic Claude provider.
//!
//! `POST {base}/messages` with `x-api-key` and `anthropic-version`
//! headers. This vendor takes the system prompt as a top-level field, so
//! system-role messages are extracted out of the message list. The
//! `max_tokens` field is mandatory on the wire and gets a default when the
//! request carries none.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use mentora_core::ai::provider::AiProvider;
use mentora_types::ai::{
    AiError, CompletionRequest, CompletionResponse, MessageRole, ModelInfo, StreamChunk,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Request body for the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

/// Response body from the Anthropic Messages API.
#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Anthropic Claude provider.
#[derive(Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    name: String,
    default_model: String,
}

// No Debug derive: the API key never reaches logs.

impl AnthropicProvider {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            name: "anthropic".to_string(),
            default_model: "claude-sonnet-4-6".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Map the neutral request onto the vendor shape, promoting
    /// system-role messages to the top-level `system` field.
    fn build_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let mut system_parts: Vec<String> = Vec::new();
        let mut messages = Vec::new();

        for message in &request.messages {
            match message.role {
                MessageRole::System => system_parts.push(message.content.clone()),
                _ => messages.push(AnthropicMessage {
                    role: message.role.to_string(),
                    content: message.content.clone(),
                }),
            }
        }

        AnthropicRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            temperature: request.temperature,
        }
    }
}

impl AiProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "claude-sonnet-4-6".to_string(),
                name: "Claude Sonnet 4.6".to_string(),
                max_tokens: 200_000,
                description: "Best for teaching".to_string(),
            },
            ModelInfo {
                id: "claude-haiku-4-5-20251001".to_string(),
                name: "Claude Haiku 4.5".to_string(),
                max_tokens: 200_000,
                description: "Fast grading".to_string(),
            },
        ]
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AiError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let vendor: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AiError::Deserialization(format!("failed to parse response: {e}")))?;

        let content: String = vendor
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect();
        if content.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        Ok(CompletionResponse {
            content,
            model: vendor.model,
            input_tokens: vendor.usage.input_tokens,
            output_tokens: vendor.usage.output_tokens,
        })
    }

    fn stream_complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>> {
        let provider = self.clone();
        Box::pin(async_stream::stream! {
            match provider.complete(&request).await {
                Ok(response) => yield Ok(StreamChunk { content: response.content, done: true }),
                Err(err) => yield Err(err),
            }
        })
    }

    /// 1-token ping completion; this vendor has no cheap list endpoint
    /// usable with an API key alone.
    async fn health_check(&self) -> Result<(), AiError> {
        let request = CompletionRequest {
            messages: vec![mentora_types::ai::Message::user("ping")],
            model: None,
            max_tokens: Some(1),
            temperature: None,
            task: mentora_types::ai::TaskType::Analysis,
        };
        self.complete(&request).await.map(|_| ())
    }
}
