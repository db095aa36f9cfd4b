/*!
 * Provider implementations for different LLM services.
 *
 * This module contains client implementations for various LLM providers:
 * - OpenAI: OpenAI chat completions API (also used for LM Studio)
 * - Anthropic: Anthropic messages API
 * - Ollama: Local LLM server
 * - Mock: Scripted provider for tests and benchmarks
 *
 * Every client maps its own wire format onto `CompletionRequest` and
 * `CompletionResponse`, so the translation service only sees the `Provider` trait.
 */

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

/// A provider-independent completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System prompt
    pub system: String,
    /// User message holding the text to translate
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request with default sampling settings
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
            max_tokens: 2048,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text and token usage returned by a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Prompt tokens, when the provider reports them
    pub prompt_tokens: Option<u64>,
    /// Completion tokens, when the provider reports them
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human-readable provider name for logs
    fn name(&self) -> &str;
}

/// Build the provider selected in the configuration
pub fn create_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let model = config.get_model();
    let endpoint = config.get_endpoint();
    let timeout = Duration::from_secs(config.get_timeout_secs());

    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::OpenAI => {
            Arc::new(openai::OpenAI::new(config.get_api_key(), endpoint, model, timeout)?)
        }
        TranslationProvider::LMStudio => {
            // LM Studio accepts any key
            let api_key = match config.get_api_key() {
                key if key.is_empty() => "lm-studio".to_string(),
                key => key,
            };
            Arc::new(openai::OpenAI::new(api_key, endpoint, model, timeout)?.with_name("LM Studio"))
        }
        TranslationProvider::Anthropic => {
            Arc::new(anthropic::Anthropic::new(config.get_api_key(), endpoint, model, timeout)?)
        }
        TranslationProvider::Ollama => {
            Arc::new(ollama::Ollama::new(endpoint, model, timeout)?)
        }
    };

    Ok(provider)
}

/// Build the shared HTTP client
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))
}

/// Map a transport-level failure to a provider error
pub(crate) fn map_request_error(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(format!("{} request timed out: {}", provider, error))
    } else if error.is_connect() {
        ProviderError::ConnectionError(format!("Failed to connect to {}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("{} request failed: {}", provider, error))
    }
}

/// Map a non-success HTTP status to a provider error
pub(crate) fn map_status_error(status: StatusCode, headers: &HeaderMap, body: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded {
            message: body,
            retry_after_secs: headers
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok()),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(body),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message: body,
        },
    }
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
