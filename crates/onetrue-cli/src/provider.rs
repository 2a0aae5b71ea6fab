//! Reasoning model selection.

use crate::config::{LlmSettings, ProviderKind, DEFAULT_OLLAMA_MODEL};
use crate::error::{CliError, Result};
use onetrue_domain::traits::LlmProvider;
use onetrue_llm::{anthropic, AnthropicProvider, LlmError, OllamaProvider};
use std::time::Duration;
use tracing::info;

/// The configured provider, chosen at run time
pub enum Provider {
    /// Anthropic Messages API
    Anthropic(AnthropicProvider),
    /// Local Ollama server
    Ollama(OllamaProvider),
}

impl Provider {
    /// Build the provider described by the settings.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let timeout = settings.timeout_secs.map(Duration::from_secs);

        let provider = match settings.provider {
            ProviderKind::Anthropic => {
                let api_key = settings
                    .api_key
                    .clone()
                    .ok_or_else(|| CliError::Config("Anthropic provider requires an API key".to_string()))?;
                let model = settings
                    .model
                    .clone()
                    .unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string());
                let mut provider = AnthropicProvider::new(api_key, model)?;
                if let Some(endpoint) = &settings.endpoint {
                    provider = provider.with_endpoint(endpoint.as_str());
                }
                if let Some(max_tokens) = settings.max_tokens {
                    provider = provider.with_max_tokens(max_tokens);
                }
                if let Some(timeout) = timeout {
                    provider = provider.with_timeout(timeout)?;
                }
                Provider::Anthropic(provider)
            }
            ProviderKind::Ollama => {
                let model = settings
                    .model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
                let mut provider = match &settings.endpoint {
                    Some(endpoint) => OllamaProvider::new(endpoint.as_str(), model)?,
                    None => OllamaProvider::default_endpoint(model)?,
                };
                if let Some(timeout) = timeout {
                    provider = provider.with_timeout(timeout)?;
                }
                info!("Using Ollama at {}", provider.endpoint());
                Provider::Ollama(provider)
            }
        };

        info!("Reasoning model: {}", provider.model_name());
        Ok(provider)
    }
}

impl LlmProvider for Provider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> std::result::Result<String, Self::Error> {
        match self {
            Provider::Anthropic(provider) => provider.generate(prompt),
            Provider::Ollama(provider) => provider.generate(prompt),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Provider::Anthropic(provider) => provider.model_name(),
            Provider::Ollama(provider) => provider.model_name(),
        }
    }
}
