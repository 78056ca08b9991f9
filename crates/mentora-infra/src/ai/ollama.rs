//! Self-hosted Ollama provider.
//!
//! Ollama exposes the OpenAI-compatible shape at `/v1/chat/completions`
//! with no auth header; only the base URL (usually a LAN address) is
//! configurable. Health is the native `/api/tags` listing.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;

use mentora_core::ai::provider::AiProvider;
use mentora_types::ai::{
    AiError, CompletionRequest, CompletionResponse, ModelInfo, StreamChunk,
};

use super::wire::{self, ChatCompletionRequest, ChatCompletionResponse};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Provider for a self-hosted Ollama instance.
#[derive(Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    name: String,
    default_model: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.into(),
            name: "ollama".to_string(),
            default_model: "llama3:8b".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            messages: wire::to_wire_messages(&request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

impl AiProvider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: self.default_model.clone(),
            name: self.default_model.clone(),
            max_tokens: 8192,
            description: "Self-hosted model via Ollama".to_string(),
        }]
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AiError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
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

        let wire_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::Deserialization(format!("failed to parse response: {e}")))?;

        wire::into_completion(wire_response)
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

    async fn health_check(&self) -> Result<(), AiError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| AiError::Transport(format!("health check failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
