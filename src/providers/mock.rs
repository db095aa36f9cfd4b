/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Translates every input line to `[lang] line`
 * - `MockProvider::intermittent(n)` - Fails every nth request with a transient error
 * - `MockProvider::transient(n)` - Fails the first n requests, then works
 * - `MockProvider::failing()` - Always fails with a non-transient error
 *
 * Clones share their request counter, so a test can keep a handle while the
 * translation service owns another.
 */

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Custom response generator
pub type Responder = Arc<dyn Fn(&CompletionRequest) -> String + Send + Sync>;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Fails the first N requests with a transient error
    Transient { failures: usize },
    /// Always fails with a non-transient error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<Responder>,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &self.behavior)
            .field("request_count", &self.request_count())
            .field("custom_response", &self.custom_response.is_some())
            .finish()
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a mock that fails `failures` times before succeeding
    pub fn transient(failures: usize) -> Self {
        Self::new(MockBehavior::Transient { failures })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response<F>(mut self, generator: F) -> Self
    where
        F: Fn(&CompletionRequest) -> String + Send + Sync + 'static,
    {
        self.custom_response = Some(Arc::new(generator));
        self
    }

    /// Translate each line of the request with a per-line function
    pub fn with_line_translator<F>(self, translate: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.with_custom_response(move |request| {
            request.user.split('\n').map(|line| translate(line)).collect::<Vec<_>>().join("\n")
        })
    }

    /// Number of requests received so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Default translation: prefix each line with the target language tag
    /// found in the system prompt
    pub fn generate_line_response(request: &CompletionRequest) -> String {
        let language = Self::target_language(&request.system);
        request.user
            .split('\n')
            .map(|line| format!("[{}] {}", language, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn target_language(system: &str) -> &str {
        // Prompts read "... from <source> to <target>."
        system.lines()
            .next()
            .and_then(|line| line.rsplit(" to ").next())
            .map(|rest| rest.trim_end_matches('.').trim())
            .unwrap_or("translated")
    }

    fn respond(&self, request: &CompletionRequest) -> CompletionResponse {
        let text = match &self.custom_response {
            Some(generator) => generator(request),
            None => Self::generate_line_response(request),
        };

        CompletionResponse {
            prompt_tokens: Some(request.user.len() as u64),
            completion_tokens: Some((text.len() / 2) as u64),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response.clone(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Transient { failures } => {
                if count < failures {
                    Err(ProviderError::ConnectionError(format!("Simulated connection reset (request #{})", count + 1)))
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::AuthenticationError(
                "Simulated provider failure".to_string(),
            )),

            MockBehavior::Empty => Ok(CompletionResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(&request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::AuthenticationError("Simulated provider failure".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
