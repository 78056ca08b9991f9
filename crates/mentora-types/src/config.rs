//! Configuration types for Mentora.
//!
//! Deserialized from `config.toml` by the infra loader. Every field has a
//! default so a missing or partial file still yields a runnable config
//! (with no providers registered, startup will refuse to serve).

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Ordered provider list; order is the router's fallback order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL. Defaults to a local SQLite file.
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://mentora.db?mode=rwc".to_string()
}

/// Engine tuning: compaction thresholds and response bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Compact once this many uncompacted messages accumulate.
    #[serde(default = "default_compact_threshold")]
    pub compact_threshold: usize,
    /// Compact once the uncompacted tail exceeds this estimated token count.
    #[serde(default = "default_compact_token_threshold")]
    pub compact_token_threshold: usize,
    /// Most recent messages always kept verbatim when compacting.
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,
    /// Max output tokens for the teaching completion.
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compact_threshold: default_compact_threshold(),
            compact_token_threshold: default_compact_token_threshold(),
            keep_recent: default_keep_recent(),
            max_response_tokens: default_max_response_tokens(),
        }
    }
}

fn default_compact_threshold() -> usize {
    16
}

fn default_compact_token_threshold() -> usize {
    6000
}

fn default_keep_recent() -> usize {
    4
}

fn default_max_response_tokens() -> u32 {
    1024
}

/// Vendor backend kind for a configured provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Ollama,
    OpenRouter,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "open_ai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::OpenRouter => write!(f, "open_router"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open_ai" | "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "google" => Ok(ProviderKind::Google),
            "ollama" => Ok(ProviderKind::Ollama),
            "open_router" | "openrouter" => Ok(ProviderKind::OpenRouter),
            other => Err(format!("invalid provider kind: '{other}'")),
        }
    }
}

/// Configuration for a single provider in the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registration name (e.g., "openai", "claude").
    pub name: String,
    pub kind: ProviderKind,
    /// Environment variable holding the API key. Providers that need a key
    /// are skipped with a warning when the variable is unset.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Override the vendor's default base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default model for this provider.
    #[serde(default)]
    pub model: Option<String>,
}
