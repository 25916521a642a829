//! LLM provider factory.
//!
//! This module provides a factory for creating LLM clients based on
//! application configuration. It handles provider resolution and secret
//! injection.

use crate::client::LlmClient;
use crate::providers::{GroqClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "groq")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
/// * `timeout_secs` - Optional request timeout
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required secrets are missing
/// - Client initialization fails
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<Arc<dyn LlmClient>, String> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            let client = match timeout_secs {
                Some(secs) => {
                    OllamaClient::with_timeout(base_url, secs).map_err(|e| e.to_string())?
                }
                None => OllamaClient::with_base_url(base_url),
            };
            Ok(Arc::new(client))
        }
        Some(ProviderType::Groq) => {
            let key = api_key.ok_or_else(|| "Groq provider requires API key".to_string())?;
            let client = match endpoint {
                Some(url) => GroqClient::with_base_url(url, key),
                None => GroqClient::new(key),
            };
            Ok(Arc::new(client))
        }
        None => Err(format!("Unknown provider: {}", provider)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint_and_timeout() {
        let client = create_client("ollama", Some("http://localhost:8080"), None, Some(30));
        assert!(client.is_ok());
    }

    #[test]
    fn test_groq_requires_api_key() {
        match create_client("groq", None, None, None) {
            Err(err) => assert!(err.contains("Groq provider requires API key")),
            Ok(_) => panic!("Expected error for Groq without API key"),
        }
    }

    #[test]
    fn test_create_groq_client() {
        let client = create_client("groq", None, Some("key"), None).unwrap();
        assert_eq!(client.provider_name(), "groq");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, None) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
