//! Configuration loader for Mentora.
//!
//! Reads `config.toml` and deserializes it into [`AppConfig`]. Falls back
//! to defaults when the file is missing or malformed -- a bad config file
//! should never keep the service from starting (the provider precondition
//! at startup catches genuinely empty deployments).

use std::path::Path;

use mentora_types::config::AppConfig;

/// Load application configuration from the given path.
///
/// - Missing file: returns [`AppConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_config(path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config file at {}, using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("failed to parse {}: {err}, using defaults", path.display());
            AppConfig::default()
        }
    }
}
