//! OpenRouter provider.
//!
//! OpenAI-compatible shape plus the two attribution headers OpenRouter
//! uses for app rankings (`HTTP-Referer`, `X-Title`).

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};

use mentora_core::ai::provider::AiProvider;
use mentora_types::ai::{
    AiError, CompletionRequest, CompletionResponse, ModelInfo, StreamChunk,
};

use super::wire::{self, ChatCompletionRequest, ChatCompletionResponse};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const REFERER: &str = "https://mentora.app";
const TITLE: &str = "Mentora";

/// Provider for the OpenRouter aggregation API.
#[derive(Clone)]
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    name: String,
    default_model: String,
}

// No Debug derive: the API key never reaches logs.

impl OpenRouterProvider {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            name: "openrouter".to_string(),
            default_model: "qwen/qwen-2.5-72b-instruct".to_string(),
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

impl AiProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "qwen/qwen-2.5-72b-instruct".to_string(),
            name: "Qwen 2.5 72B".to_string(),
            max_tokens: 32_768,
            description: "Large open-weight model via OpenRouter".to_string(),
        }]
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AiError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
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
            .get(format!("{}/models", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
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
