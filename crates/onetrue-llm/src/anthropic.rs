//! Anthropic Messages API provider
//!
//! Sends each prompt as a single user message and returns the concatenated
//! text blocks of the reply.

use crate::{status_error, LlmError};
use onetrue_domain::traits::LlmProvider as LlmProviderTrait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Messages API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// Default model used for adjudication
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Default completion budget
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// API version header value
pub const API_VERSION: &str = "2023-06-01";

/// Default timeout for a single request
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Provider for the Anthropic Messages API
pub struct AnthropicProvider {
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn into_text(self) -> Result<String, LlmError> {
        let text: String = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse("Response contained no text".to_string()));
        }
        Ok(text)
    }
}

impl AnthropicProvider {
    /// Create a provider for `model` with the given API key
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Authentication`] for an empty key, or
    /// [`LlmError::Other`] if the HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Authentication("API key is empty".to_string()));
        }
        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: Self::client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    fn client(timeout: Duration) -> Result<reqwest::blocking::Client, LlmError> {
        reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))
    }

    /// Point at a different base URL (proxies, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the completion budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = Self::client(timeout)?;
        Ok(self)
    }
}

impl LlmProviderTrait for AnthropicProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let url = format!("{}/v1/messages", self.endpoint);
        debug!(model = %self.model, max_tokens = self.max_tokens, "POST {}", url);

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &self.model, text));
        }

        response
            .json::<MessagesResponse>()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?
            .into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
