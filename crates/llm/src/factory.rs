//! LLM provider factory.
//!
//! Builds a generation client from a provider name, an optional endpoint
//! and an optional API key.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::{ProviderType, DEFAULT_TOGETHER_URL};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "together")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by hosted providers
///
/// # Errors
/// Returns error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| format!("Unknown provider: {}", provider))?;
    let default_endpoint = if provider.eq_ignore_ascii_case("together") {
        DEFAULT_TOGETHER_URL
    } else {
        provider_type.default_endpoint()
    };
    let base_url = endpoint.unwrap_or(default_endpoint);

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_base_url(base_url))),
        ProviderType::OpenAI => {
            let key = api_key
                .filter(|k| !k.is_empty())
                .ok_or_else(|| format!("{} provider requires API key", provider))?;
            Ok(Arc::new(OpenAiClient::with_endpoint(base_url, key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(err) => assert!(err.contains("requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
        assert!(create_client("openai", None, Some("")).is_err());
    }

    #[test]
    fn test_together_uses_openai_protocol() {
        let client = create_client(
            "together",
            Some("https://api.together.xyz/v1"),
            Some("key"),
        )
        .unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
