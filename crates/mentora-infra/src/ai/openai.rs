//! OpenAI-compatible provider.
//!
//! One adapter covers OpenAI itself and any OpenAI-compatible endpoint
//! (DeepSeek, Groq, Together, ...) via a configurable base URL. Bearer
//! auth, `POST {base}/chat/completions`, `choices[0].message.content`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed
//! when building request headers.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};

use mentora_core::ai::provider::AiProvider;
use mentora_types::ai::{
    AiError, CompletionRequest, CompletionResponse, ModelInfo, StreamChunk,
};

use super::wire::{self, ChatCompletionRequest, ChatCompletionResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Provider for OpenAI and OpenAI-compatible APIs.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    name: String,
    default_model: String,
}

// No Debug derive: keeps the client and any header state out of logs.

impl OpenAiProvider {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            name: "openai".to_string(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }

    /// Provider preconfigured for the DeepSeek API (OpenAI-compatible).
    pub fn deepseek(api_key: SecretString) -> Self {
        Self::new(api_key)
            .with_base_url(DEEPSEEK_BASE_URL)
            .with_name("deepseek")
            .with_model("deepseek-chat")
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the model used when a request carries none.
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

impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4o".to_string(),
                name: "GPT-4o".to_string(),
                max_tokens: 128_000,
                description: "Most capable OpenAI model".to_string(),
            },
            ModelInfo {
                id: "gpt-4o-mini".to_string(),
                name: "GPT-4o Mini".to_string(),
                max_tokens: 128_000,
                description: "Fast, affordable OpenAI model".to_string(),
            },
        ]
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AiError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
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

#[cfg(test)]
mod tests {
    use super::*;
    use mentora_types::ai::{Message, TaskType};

    fn make_provider() -> OpenAiProvider {
        OpenAiProvider::new(SecretString::from("test-key-not-real"))
    }

    fn neutral_request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                Message::system("You are a tutor."),
                Message::user("What is x?"),
            ],
            model: None,
            max_tokens: Some(256),
            temperature: Some(0.7),
            task: TaskType::Teaching,
        }
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(make_provider().name(), "openai");
    }

    #[test]
    fn test_deepseek_factory() {
        let provider = OpenAiProvider::deepseek(SecretString::from("key"));
        assert_eq!(provider.name(), "deepseek");
        assert_eq!(provider.base_url, DEEPSEEK_BASE_URL);
        assert_eq!(provider.default_model, "deepseek-chat");
    }

    #[test]
    fn test_build_request_inlines_system_message() {
        let provider = make_provider();
        let body = provider.build_request(&neutral_request());
        let json = serde_json::to_value(&body).unwrap();

        // System message stays inline in the message list for this vendor.
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "You are a tutor.");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn test_build_request_honors_model_override() {
        let provider = make_provider();
        let request = CompletionRequest {
            model: Some("gpt-4o".to_string()),
            ..neutral_request()
        };
        assert_eq!(provider.build_request(&request).model, "gpt-4o");
    }

    #[test]
    fn test_with_base_url() {
        let provider = make_provider().with_base_url("http://localhost:8080/v1");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_models_metadata() {
        let models = make_provider().models();
        assert_eq!(models.len(), 2);
        assert!(models.iter().any(|m| m.id == "gpt-4o-mini"));
    }
}
