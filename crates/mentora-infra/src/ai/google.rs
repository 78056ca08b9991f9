//! Google Gemini provider.
//!
//! `POST {base}/models/{model}:generateContent?key={key}` -- auth rides in
//! the query string, not a header. Gemini knows only `user` and `model`
//! roles: assistant messages map to `model`, and system-role messages are
//! dropped from the content list (this vendor path has no system slot).

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use mentora_core::ai::provider::AiProvider;
use mentora_types::ai::{
    AiError, CompletionRequest, CompletionResponse, MessageRole, ModelInfo, StreamChunk,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request body for the Gemini generateContent API.
#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

/// Response body from the Gemini API.
#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: UsageMetadata,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

/// Google Gemini provider.
#[derive(Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    name: String,
    default_model: String,
}

// No Debug derive: the key appears in URLs, never in logs.

impl GoogleProvider {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            name: "google".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
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

    fn resolve_model(&self, request: &CompletionRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }

    fn build_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .filter_map(|message| {
                let role = match message.role {
                    // No system slot on this path; drop rather than mistranslate.
                    MessageRole::System => return None,
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                };
                Some(GeminiContent {
                    role: role.to_string(),
                    parts: vec![GeminiPart {
                        text: message.content.clone(),
                    }],
                })
            })
            .collect();

        let generation_config = if request.max_tokens.is_some() || request.temperature.is_some() {
            Some(GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            })
        } else {
            None
        };

        GeminiRequest {
            contents,
            generation_config,
        }
    }
}

impl AiProvider for GoogleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gemini-2.5-pro".to_string(),
                name: "Gemini 2.5 Pro".to_string(),
                max_tokens: 1_048_576,
                description: "Most capable Google model".to_string(),
            },
            ModelInfo {
                id: "gemini-2.5-flash".to_string(),
                name: "Gemini 2.5 Flash".to_string(),
                max_tokens: 1_048_576,
                description: "Fast, affordable Google model".to_string(),
            },
        ]
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AiError> {
        let model = self.resolve_model(request);
        let body = self.build_request(request);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            model,
            self.api_key.expose_secret()
        );

        let response = self
            .client
            .post(url)
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

        let vendor: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AiError::Deserialization(format!("failed to parse response: {e}")))?;

        let content: String = vendor
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect()
            })
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        // Gemini does not echo the model; report what was requested.
        Ok(CompletionResponse {
            content,
            model,
            input_tokens: vendor.usage_metadata.prompt_token_count,
            output_tokens: vendor.usage_metadata.candidates_token_count,
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

    async fn health_check(&self) -> Result<(), AiError> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key.expose_secret());

        let response = self
            .client
            .get(url)
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

    fn make_provider() -> GoogleProvider {
        GoogleProvider::new(SecretString::from("test-key-not-real"))
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
        assert_eq!(make_provider().name(), "google");
    }

    #[test]
    fn test_build_request_drops_system_messages() {
        let provider = make_provider();
        let json = serde_json::to_value(provider.build_request(&neutral_request())).unwrap();

        // The system message is dropped, not translated.
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "What is x?");
    }

    #[test]
    fn test_build_request_maps_assistant_to_model_role() {
        let provider = make_provider();
        let request = CompletionRequest {
            messages: vec![
                Message::user("q"),
                Message::assistant("a"),
            ],
            ..neutral_request()
        };
        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(json["contents"][1]["role"], "model");
    }

    #[test]
    fn test_generation_config_only_when_needed() {
        let provider = make_provider();

        let with = provider.build_request(&neutral_request());
        let json = serde_json::to_value(&with).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 256);

        let request = CompletionRequest {
            max_tokens: None,
            temperature: None,
            ..neutral_request()
        };
        let without = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert!(without.get("generationConfig").is_none());
    }

    #[test]
    fn test_resolve_model_default() {
        let provider = make_provider();
        assert_eq!(provider.resolve_model(&neutral_request()), "gemini-2.5-flash");

        let request = CompletionRequest {
            model: Some("gemini-2.5-pro".to_string()),
            ..neutral_request()
        };
        assert_eq!(provider.resolve_model(&request), "gemini-2.5-pro");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "x is 4"}]}}],
            "usageMetadata": {"promptTokenCount": 15, "candidatesTokenCount": 4}
        }"#;
        let vendor: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(vendor.candidates[0].content.parts[0].text, "x is 4");
        assert_eq!(vendor.usage_metadata.prompt_token_count, 15);
    }
}
