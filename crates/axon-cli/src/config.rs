//! Configuration loading and validation

use anyhow::{Context, Result};
use axon_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Hub URLs registered at startup
    #[serde(default)]
    pub hubs: Vec<String>,
}

impl Config {
    /// Load the configuration file, or fall back to defaults when it
    /// does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            info!(path = %path.display(), hubs = config.hubs.len(), "Loaded configuration");
            Ok(config)
        } else {
            info!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            hubs = ["http://127.0.0.1:4444/", "http://hub.local:4444/"]

            [runtime]
            request_timeout_ms = 2000
            cache_validity_ms = 10
            directory_ttl_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.hubs.len(), 2);
        assert_eq!(config.runtime.request_timeout_ms, 2000);
        assert_eq!(config.runtime.cache_validity_ms, 10);
        assert_eq!(config.runtime.directory_ttl_ms, 250);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.hubs.is_empty());
        assert_eq!(config.runtime.request_timeout_ms, 5000);
        assert_eq!(config.runtime.cache_validity_ms, 5);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/axon.toml")).unwrap();
        assert!(config.hubs.is_empty());
    }
}
