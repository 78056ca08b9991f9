//! BoxAiProvider -- object-safe dynamic dispatch wrapper for AiProvider.
//!
//! 1. Define an object-safe `AiProviderDyn` trait with boxed futures
//! 2. Blanket-impl `AiProviderDyn` for all `T: AiProvider`
//! 3. `BoxAiProvider` wraps `Box<dyn AiProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use mentora_types::ai::{AiError, CompletionRequest, CompletionResponse, ModelInfo, StreamChunk};

use super::provider::AiProvider;

/// Object-safe version of [`AiProvider`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn AiProviderDyn`).
/// A blanket implementation is provided for all types implementing
/// `AiProvider`.
pub trait AiProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn models(&self) -> Vec<ModelInfo>;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, AiError>> + Send + 'a>>;

    fn stream_complete_boxed(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>>;

    fn health_check_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), AiError>> + Send + 'a>>;
}

/// Blanket implementation: any `AiProvider` automatically implements
/// `AiProviderDyn`.
impl<T: AiProvider> AiProviderDyn for T {
    fn name(&self) -> &str {
        AiProvider::name(self)
    }

    fn models(&self) -> Vec<ModelInfo> {
        AiProvider::models(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, AiError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }

    fn stream_complete_boxed(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>> {
        self.stream_complete(request)
    }

    fn health_check_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), AiError>> + Send + 'a>> {
        Box::pin(self.health_check())
    }
}

/// Type-erased AI provider for runtime registration in the router.
///
/// Since `AiProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxAiProvider` provides equivalent methods that delegate to
/// the inner `AiProviderDyn` trait object.
pub struct BoxAiProvider {
    inner: Box<dyn AiProviderDyn + Send + Sync>,
}

impl BoxAiProvider {
    /// Wrap a concrete `AiProvider` in a type-erased box.
    pub fn new<T: AiProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Registration name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Static capability metadata.
    pub fn models(&self) -> Vec<ModelInfo> {
        self.inner.models()
    }

    /// Send a completion request and receive the full response.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, AiError> {
        self.inner.complete_boxed(request).await
    }

    /// Streaming completion (single-chunk in this core).
    pub fn stream_complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>> {
        self.inner.stream_complete_boxed(request)
    }

    /// Cheap reachability/auth check against the vendor.
    pub async fn health_check(&self) -> Result<(), AiError> {
        self.inner.health_check_boxed().await
    }
}
