/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct and its implementation,
 * which sends text to the configured provider and applies the retry, rate-limit
 * and caching policies around each request.
 */

use log::{debug, warn};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::TranslationConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils;
use crate::providers::{self, CompletionRequest, CompletionResponse, Provider};
use super::cache::TranslationCache;
use super::prompts;

/// Upper bound for a single retry delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of provider requests, retries included
    pub requests: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
            model,
        }
    }

    /// Record one provider request
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>, duration: Duration) {
        self.requests += 1;
        self.api_duration += duration;

        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Requests: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Spaces requests evenly to stay under a requests-per-minute limit
#[derive(Debug)]
struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<tokio::time::Instant>,
}

impl RateLimiter {
    fn new(requests_per_minute: u32) -> Option<Self> {
        if requests_per_minute == 0 {
            return None;
        }
        Some(Self {
            interval: Duration::from_secs(60) / requests_per_minute,
            next_slot: Mutex::new(tokio::time::Instant::now()),
        })
    }

    async fn acquire(&self) {
        let wait = {
            let mut next = self.next_slot.lock();
            let now = tokio::time::Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.interval;
            slot - now
        };

        if !wait.is_zero() {
            debug!("Rate limit: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

/// Delay before retry number `attempt` (zero-based): exponential from `base_ms`,
/// at least the provider's Retry-After hint, capped at 30 seconds
pub fn backoff_delay(base_ms: u64, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let exponential = base_ms.saturating_mul(1u64 << attempt.min(20));
    let hinted = retry_after_secs.map(|secs| secs.saturating_mul(1000)).unwrap_or(0);
    Duration::from_millis(exponential.max(hinted)).min(MAX_RETRY_DELAY)
}

/// Add up to 10% random jitter
fn with_jitter(delay: Duration) -> Duration {
    let max_jitter = delay.as_millis() as u64 / 10;
    if max_jitter == 0 {
        return delay;
    }
    let jitter = rand::rng().random_range(0..=max_jitter);
    delay + Duration::from_millis(jitter)
}

/// Main translation service
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Provider the requests go to
    provider: Arc<dyn Provider>,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// Translation cache for storing and retrieving translations
    pub cache: TranslationCache,

    /// Separator between language and region in language codes
    language_separator: String,

    usage: Arc<Mutex<TokenUsageStats>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl TranslationService {
    /// Create a new translation service for the configured provider
    pub fn new(config: TranslationConfig) -> Result<Self, ProviderError> {
        let provider = providers::create_provider(&config)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Create a translation service around an existing provider
    pub fn with_provider(config: TranslationConfig, provider: Arc<dyn Provider>) -> Self {
        let usage = TokenUsageStats::with_provider_info(provider.name().to_string(), config.get_model());
        let rate_limiter = config.get_rate_limit()
            .and_then(RateLimiter::new)
            .map(Arc::new);

        Self {
            cache: TranslationCache::new(config.common.cache_enabled),
            provider,
            config,
            language_separator: "-".to_string(),
            usage: Arc::new(Mutex::new(usage)),
            rate_limiter,
        }
    }

    /// Set the separator used to strip regions from language codes
    pub fn with_language_separator(mut self, separator: impl Into<String>) -> Self {
        self.language_separator = separator.into();
        self
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Snapshot of the token usage so far
    pub fn usage_stats(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Translate a single text segment. Line breaks inside the text are kept.
    pub async fn translate_text(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        if let Some(cached) = self.cache.get(text, source_language, target_language) {
            return Ok(cached);
        }

        let request = self.build_request(text.to_string(), source_language, target_language);
        let mut translations = self
            .complete_validated(request, |response| prompts::parse_single_response(response).map(|t| vec![t]))
            .await?;
        let translated = translations.pop().unwrap_or_default();

        self.cache.store(text, source_language, target_language, &translated);
        Ok(translated)
    }

    /// Translate single-line segments in one request, one segment per line
    pub async fn translate_lines<S: AsRef<str>>(
        &self,
        lines: &[S],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, TranslationError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        if lines.iter().any(|line| line.as_ref().trim().is_empty()) {
            return Err(TranslationError::EmptyInput);
        }

        let expected = lines.len();
        let request = self.build_request(prompts::batch_prompt(lines), source_language, target_language);
        let translations = self
            .complete_validated(request, |response| prompts::parse_batch_response(response, expected))
            .await?;

        for (line, translated) in lines.iter().zip(&translations) {
            self.cache.store(line.as_ref(), source_language, target_language, translated);
        }

        Ok(translations)
    }

    fn build_request(&self, user: String, source_language: &str, target_language: &str) -> CompletionRequest {
        let system = prompts::system_prompt(
            &self.config.common.system_prompt,
            &language_utils::prompt_language_name(source_language, &self.language_separator),
            &language_utils::prompt_language_name(target_language, &self.language_separator),
        );

        CompletionRequest::new(system, user)
            .temperature(self.config.common.temperature)
            .max_tokens(self.config.common.max_tokens)
    }

    /// Send a request and validate the response, retrying malformed responses
    async fn complete_validated<F>(&self, request: CompletionRequest, parse: F) -> Result<Vec<String>, TranslationError>
    where
        F: Fn(&str) -> Result<Vec<String>, TranslationError>,
    {
        let retry_count = self.config.common.retry_count;
        let mut attempt = 0;

        loop {
            let response = self.complete_with_retry(request.clone()).await?;

            match parse(&response.text) {
                Ok(translations) => return Ok(translations),
                Err(e) if attempt < retry_count => {
                    let delay = with_jitter(backoff_delay(self.config.common.retry_backoff_ms, attempt, None));
                    warn!("Unusable response from {} ({}), retrying in {:?}", self.provider.name(), e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a request, retrying transient provider errors with backoff
    async fn complete_with_retry(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let retry_count = self.config.common.retry_count;
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.acquire().await;
            }

            let start = Instant::now();
            let result = self.provider.complete(request.clone()).await;
            let elapsed = start.elapsed();

            match result {
                Ok(response) => {
                    self.usage.lock().add_token_usage(response.prompt_tokens, response.completion_tokens, elapsed);
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < retry_count => {
                    self.usage.lock().add_token_usage(None, None, elapsed);
                    let delay = with_jitter(backoff_delay(
                        self.config.common.retry_backoff_ms,
                        attempt,
                        e.retry_after_secs(),
                    ));
                    warn!(
                        "{} request failed ({}), retry {}/{} in {:?}",
                        self.provider.name(), e, attempt + 1, retry_count, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.usage.lock().add_token_usage(None, None, elapsed);
                    return Err(e);
                }
            }
        }
    }
}
