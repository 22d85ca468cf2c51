// Configuration layer for creating chat clients from settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::openai::OpenAIClient;
use crate::traits::ChatClient;

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// Base URL for the API (optional, defaults to https://api.openai.com/v1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Factory for creating LLM clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_chat_client(config: OpenAIConfig) -> Result<Arc<dyn ChatClient>> {
        if config.api_key.trim().is_empty() {
            anyhow::bail!("OpenAI API key is empty");
        }

        let mut client =
            OpenAIClient::new(config.api_key).context("Failed to build OpenAI client")?;
        if let Some(base_url) = config.base_url {
            client = client.with_base_url(base_url);
        }

        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(ClientFactory::create_chat_client(OpenAIConfig::new("  ")).is_err());
    }

    #[test]
    fn test_create_with_base_url() {
        let config = OpenAIConfig::new("sk-test").with_base_url("http://127.0.0.1:1/v1");
        assert!(ClientFactory::create_chat_client(config).is_ok());
    }

    #[test]
    fn test_serde_roundtrip_omits_default_base_url() {
        let json = serde_json::to_string(&OpenAIConfig::new("sk-test")).unwrap();
        assert!(!json.contains("base_url"));

        let parsed: OpenAIConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_key, "sk-test");
        assert!(parsed.base_url.is_none());
    }
}
