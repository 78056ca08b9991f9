//! AiProvider trait definition.
//!
//! This is the core abstraction that all AI vendor adapters implement.
//! Uses RPITIT for `complete` and `health_check`, and `Pin<Box<dyn Stream>>`
//! for `stream_complete` (streams need to be object-safe for the
//! BoxAiProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use mentora_types::ai::{AiError, CompletionRequest, CompletionResponse, ModelInfo, StreamChunk};

/// Trait for AI provider backends (OpenAI-compatible, Anthropic, Google,
/// Ollama, OpenRouter).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition) for
/// `complete` and `health_check`. `stream_complete` returns a boxed
/// stream because streams need to be object-safe for `BoxAiProvider`.
///
/// Implementations live in mentora-infra and are stateless aside from an
/// HTTP client.
pub trait AiProvider: Send + Sync {
    /// Registration name (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Static capability metadata for the models this provider serves.
    fn models(&self) -> Vec<ModelInfo>;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, AiError>> + Send;

    /// Streaming completion. Providers in this core emit the whole
    /// response as a single `done` chunk rather than incremental deltas.
    fn stream_complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>>;

    /// Cheap vendor call (list models or a 1-token ping) to verify the
    /// provider is reachable and authenticated.
    fn health_check(&self) -> impl std::future::Future<Output = Result<(), AiError>> + Send;
}
