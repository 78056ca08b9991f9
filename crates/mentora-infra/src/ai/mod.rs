//! AI vendor adapters and the router factory.
//!
//! One adapter per vendor, each implementing `AiProvider` from
//! mentora-core. `build_router` turns the ordered provider list from
//! config into a registered fallback chain, resolving API keys from the
//! environment variables named in config.

pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod openrouter;
pub mod wire;

use secrecy::SecretString;

use mentora_core::ai::box_provider::BoxAiProvider;
use mentora_core::ai::router::AiRouter;
use mentora_types::config::{ProviderConfig, ProviderKind};

use self::anthropic::AnthropicProvider;
use self::google::GoogleProvider;
use self::ollama::OllamaProvider;
use self::openai::OpenAiProvider;
use self::openrouter::OpenRouterProvider;

/// Build the router from the configured provider list.
///
/// Config order is registration order is fallback order. Providers whose
/// API key env var is unset are skipped with a warning so a partially
/// configured deployment still starts with whatever chain it has.
pub fn build_router(configs: &[ProviderConfig]) -> AiRouter {
    let mut router = AiRouter::new();

    for config in configs {
        let Some(provider) = build_provider(config) else {
            continue;
        };
        tracing::info!(provider = %config.name, kind = %config.kind, "AI provider registered");
        router.register(&config.name, provider);
    }

    router
}

fn build_provider(config: &ProviderConfig) -> Option<BoxAiProvider> {
    match config.kind {
        ProviderKind::OpenAi => {
            let mut provider =
                OpenAiProvider::new(resolve_api_key(config)?).with_name(&config.name);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Some(BoxAiProvider::new(provider))
        }
        ProviderKind::Anthropic => {
            let mut provider =
                AnthropicProvider::new(resolve_api_key(config)?).with_name(&config.name);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Some(BoxAiProvider::new(provider))
        }
        ProviderKind::Google => {
            let mut provider =
                GoogleProvider::new(resolve_api_key(config)?).with_name(&config.name);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Some(BoxAiProvider::new(provider))
        }
        ProviderKind::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string());
            let mut provider = OllamaProvider::new(base_url).with_name(&config.name);
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Some(BoxAiProvider::new(provider))
        }
        ProviderKind::OpenRouter => {
            let mut provider =
                OpenRouterProvider::new(resolve_api_key(config)?).with_name(&config.name);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Some(BoxAiProvider::new(provider))
        }
    }
}

/// Resolve the provider's API key from the env var named in config.
fn resolve_api_key(config: &ProviderConfig) -> Option<SecretString> {
    let Some(var) = &config.api_key_env else {
        tracing::warn!(provider = %config.name, "no api_key_env configured, skipping provider");
        return None;
    };

    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Some(SecretString::from(value)),
        _ => {
            tracing::warn!(
                provider = %config.name,
                env = %var,
                "API key environment variable unset, skipping provider"
            );
            None
        }
    }
}
