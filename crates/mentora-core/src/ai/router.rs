//! Registration-ordered provider fallback chain.
//!
//! The router holds a name-indexed set of providers and tries them in
//! registration order until one succeeds. Fallback order is fixed at
//! startup: "try the first configured provider, then degrade" is the
//! policy, not live cost/latency selection. The `task` field on a request
//! travels through unchanged and does not influence provider order.

use std::collections::HashMap;

use mentora_types::ai::{AiError, CompletionRequest, CompletionResponse, ModelInfo};

use super::box_provider::BoxAiProvider;

/// Routes completion requests through registered providers in order.
///
/// Registration happens at startup, before the router is shared behind an
/// `Arc`; after that the router is read-only, so routing needs no locks.
pub struct AiRouter {
    providers: HashMap<String, BoxAiProvider>,
    /// Registration order; equals fallback priority.
    fallback: Vec<String>,
}

impl AiRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            fallback: Vec::new(),
        }
    }

    /// Register a provider. Registration order is fallback order.
    pub fn register(&mut self, name: impl Into<String>, provider: BoxAiProvider) {
        let name = name.into();
        self.providers.insert(name.clone(), provider);
        self.fallback.push(name);
    }

    /// True if at least one provider is registered. Used as a startup
    /// precondition; call outcomes never change it.
    pub fn has_provider(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Names of registered providers in fallback order.
    pub fn provider_names(&self) -> &[String] {
        &self.fallback
    }

    /// Aggregate model catalog across all registered providers, in
    /// fallback order.
    pub fn available_models(&self) -> Vec<ModelInfo> {
        self.fallback
            .iter()
            .filter_map(|name| self.providers.get(name))
            .flat_map(|provider| provider.models())
            .collect()
    }

    /// Route a request to the first provider that succeeds.
    ///
    /// Each provider failure is logged at warning level and the next
    /// provider in the chain is tried. When the chain is exhausted the
    /// caller gets a single aggregate error; individual vendor errors are
    /// never propagated.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, AiError> {
        for name in &self.fallback {
            let provider = &self.providers[name];

            match provider.complete(request).await {
                Ok(response) => {
                    tracing::debug!(
                        provider = %name,
                        model = %response.model,
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        "AI request completed"
                    );
                    return Ok(response);
                }
                Err(err) => {
                    tracing::warn!(
                        provider = %name,
                        error = %err,
                        "AI provider failed, trying next"
                    );
                }
            }
        }

        Err(AiError::AllProvidersFailed)
    }
}

impl Default for AiRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::AiProvider;
    use futures_util::Stream;
    use mentora_types::ai::{Message, StreamChunk, TaskType};
    use std::future::Future;
    use std::pin::Pin;

    struct MockProvider {
        name: String,
        response: Result<String, String>,
    }

    impl MockProvider {
        fn ok(name: &str, content: &str) -> Self {
            Self {
                name: name.to_string(),
                response: Ok(content.to_string()),
            }
        }

        fn failing(name: &str, error: &str) -> Self {
            Self {
                name: name.to_string(),
                response: Err(error.to_string()),
            }
        }
    }

    impl AiProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn models(&self) -> Vec<ModelInfo> {
            vec![ModelInfo {
                id: format!("{}-model", self.name),
                name: format!("{} model", self.name),
                max_tokens: 4096,
                description: "test model".to_string(),
            }]
        }

        fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, AiError>> + Send {
            let response = self.response.clone();
            let model = format!("{}-model", self.name);
            async move {
                match response {
                    Ok(content) => Ok(CompletionResponse {
                        content,
                        model,
                        input_tokens: 10,
                        output_tokens: 20,
                    }),
                    Err(message) => Err(AiError::Transport(message)),
                }
            }
        }

        fn stream_complete(
            &self,
            request: CompletionRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>> {
            let response = self.response.clone();
            let _ = request;
            Box::pin(async_stream::stream! {
                match response {
                    Ok(content) => yield Ok(StreamChunk { content, done: true }),
                    Err(message) => yield Err(AiError::Transport(message)),
                }
            })
        }

        fn health_check(&self) -> impl Future<Output = Result<(), AiError>> + Send {
            let response = self.response.clone();
            async move {
                response.map(|_| ()).map_err(AiError::Transport)
            }
        }
    }

    fn test_request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("What is x + 1?")],
            model: None,
            max_tokens: Some(256),
            temperature: None,
            task: TaskType::Teaching,
        }
    }

    #[tokio::test]
    async fn test_first_provider_succeeds() {
        let mut router = AiRouter::new();
        router.register("primary", BoxAiProvider::new(MockProvider::ok("primary", "from primary")));
        router.register(
            "secondary",
            BoxAiProvider::new(MockProvider::ok("secondary", "from secondary")),
        );

        let resp = router.complete(&test_request()).await.unwrap();
        assert_eq!(resp.content, "from primary");
        assert_eq!(resp.model, "primary-model");
    }

    #[tokio::test]
    async fn test_fallback_skips_failed_provider() {
        let mut router = AiRouter::new();
        router.register(
            "primary",
            BoxAiProvider::new(MockProvider::failing("primary", "connection refused")),
        );
        router.register(
            "secondary",
            BoxAiProvider::new(MockProvider::ok("secondary", "from secondary")),
        );

        let resp = router.complete(&test_request()).await.unwrap();
        // Never the failed provider's response
        assert_eq!(resp.content, "from secondary");
    }

    #[tokio::test]
    async fn test_all_providers_failed() {
        let mut router = AiRouter::new();
        router.register(
            "primary",
            BoxAiProvider::new(MockProvider::failing("primary", "timeout")),
        );
        router.register(
            "secondary",
            BoxAiProvider::new(MockProvider::failing("secondary", "timeout")),
        );

        let err = router.complete(&test_request()).await.unwrap_err();
        assert!(matches!(err, AiError::AllProvidersFailed));

        // Registration state is independent of call outcomes.
        assert!(router.has_provider());
    }

    #[tokio::test]
    async fn test_empty_router_always_errors() {
        let router = AiRouter::new();
        assert!(!router.has_provider());

        let err = router.complete(&test_request()).await.unwrap_err();
        assert!(matches!(err, AiError::AllProvidersFailed));
    }

    #[tokio::test]
    async fn test_fallback_respects_registration_order() {
        let mut router = AiRouter::new();
        router.register("a", BoxAiProvider::new(MockProvider::failing("a", "down")));
        router.register("b", BoxAiProvider::new(MockProvider::failing("b", "down")));
        router.register("c", BoxAiProvider::new(MockProvider::ok("c", "from c")));

        let resp = router.complete(&test_request()).await.unwrap();
        assert_eq!(resp.content, "from c");
        assert_eq!(router.provider_names(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_available_models_in_fallback_order() {
        let mut router = AiRouter::new();
        router.register("zeta", BoxAiProvider::new(MockProvider::ok("zeta", "")));
        router.register("alpha", BoxAiProvider::new(MockProvider::ok("alpha", "")));

        let models = router.available_models();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "zeta-model");
        assert_eq!(models[1].id, "alpha-model");
    }
}
