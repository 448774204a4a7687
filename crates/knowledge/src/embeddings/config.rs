//! Embedding provider settings.

use serde::{Deserialize, Serialize};

/// Which embedding backend to use and how to call it.
///
/// Provider, model and dimensions are written into the index manifest; a
/// persisted index only loads when all three match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "openai"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Chunks sent per embedding request during ingestion
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Base URL override for HTTP providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_provider() -> String {
    "trigram".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            endpoint: None,
            api_key_env: None,
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key from `api_key_env`, if one is configured and set.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 64);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: ollama\nmodel: nomic-embed-text\ndimensions: 768\n")
                .unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_missing_api_key_env() {
        let config = EmbeddingConfig {
            api_key_env: Some("RAGCHAT_TEST_UNSET_EMBEDDING_KEY".to_string()),
            ..Default::default()
        };
        assert!(config.resolve_api_key().is_none());
    }
}
