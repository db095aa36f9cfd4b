/*!
 * Tests for translation module functionality
 *
 * The translation module is structured as follows:
 * - core: the translation service with retries, rate limiting and usage stats
 * - batch: batching of segments and bounded concurrency
 * - cache: reuse of identical translations
 * - cells: plain, set and JSON cells
 * - prompts: prompt construction and response parsing
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

use csv_translate::app_config::{JsonFieldConfig, TranslationConfig};
use csv_translate::errors::TranslationError;
use csv_translate::providers::mock::MockProvider;
use csv_translate::translation::cache::TranslationCache;
use csv_translate::translation::core::backoff_delay;
use csv_translate::translation::prompts::{batch_prompt, parse_batch_response, parse_single_response};
use csv_translate::translation::{BatchTranslator, CellKind, TokenUsageStats, TranslationService};

/// Helper function to create a test configuration
fn get_test_config() -> TranslationConfig {
    let mut config = TranslationConfig::default();
    config.common.retry_backoff_ms = 1;
    config.common.retry_count = 2;
    config.active_provider_config_mut().rate_limit = None;
    config
}

fn service_with(mock: &MockProvider) -> TranslationService {
    TranslationService::with_provider(get_test_config(), Arc::new(mock.clone()))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Test that a batch of lines goes out as one request
#[tokio::test]
async fn test_translateLines_withWorkingProvider_shouldTranslateInOneRequest() -> Result<()> {
    let mock = MockProvider::working();
    let service = service_with(&mock);

    let translated = service.translate_lines(&["Red chair", "Blue lamp"], "en-US", "de-DE").await?;

    assert_eq!(translated, vec!["[German] Red chair", "[German] Blue lamp"]);
    assert_eq!(mock.request_count(), 1);

    // Each line was cached on its own
    assert_eq!(service.cache.get("Blue lamp", "en-US", "de-DE").as_deref(), Some("[German] Blue lamp"));

    Ok(())
}

/// Test that a blank line in a batch is rejected before any request
#[tokio::test]
async fn test_translateLines_withBlankLine_shouldFailWithoutRequest() {
    let mock = MockProvider::working();
    let service = service_with(&mock);

    let result = service.translate_lines(&["ok", "  "], "en", "fr").await;

    assert!(matches!(result, Err(TranslationError::EmptyInput)));
    assert_eq!(mock.request_count(), 0);
}

/// Test that transient errors are retried until the provider recovers
#[tokio::test]
async fn test_translateText_withTransientErrors_shouldRetry() -> Result<()> {
    let mock = MockProvider::transient(2);
    let service = service_with(&mock);

    let translated = service.translate_text("Hello", "en", "fr").await?;

    assert_eq!(translated, "[French] Hello");
    assert_eq!(mock.request_count(), 3);
    assert_eq!(service.usage_stats().requests, 3);

    Ok(())
}

/// Test that retries stop after the configured count
#[tokio::test]
async fn test_translateText_withTooManyTransientErrors_shouldGiveUp() {
    let mock = MockProvider::transient(10);
    let service = service_with(&mock);

    let result = service.translate_text("Hello", "en", "fr").await;

    assert!(matches!(result, Err(TranslationError::Provider(ref e)) if e.is_transient()));
    // First attempt plus two retries
    assert_eq!(mock.request_count(), 3);
}

/// Test that non-transient errors are not retried
#[tokio::test]
async fn test_translateText_withFailingProvider_shouldCallOnce() {
    let mock = MockProvider::failing();
    let service = service_with(&mock);

    let result = service.translate_text("Hello", "en", "fr").await;

    assert!(matches!(result, Err(TranslationError::Provider(_))));
    assert_eq!(mock.request_count(), 1);
}

/// Test that empty responses are retried and then reported
#[tokio::test]
async fn test_translateText_withEmptyResponses_shouldFailAfterRetries() {
    let mock = MockProvider::empty();
    let service = service_with(&mock);

    let result = service.translate_text("Hello", "en", "fr").await;

    assert!(matches!(result, Err(TranslationError::CountMismatch { expected: 1, got: 0 })));
    assert_eq!(mock.request_count(), 3);
}

/// Test that the cache can be turned off
#[tokio::test]
async fn test_translateText_withCacheDisabled_shouldAlwaysCallProvider() -> Result<()> {
    let mock = MockProvider::working();
    let mut config = get_test_config();
    config.common.cache_enabled = false;
    let service = TranslationService::with_provider(config, Arc::new(mock.clone()));

    service.translate_text("Hello", "en", "fr").await?;
    service.translate_text("Hello", "en", "fr").await?;

    assert_eq!(mock.request_count(), 2);
    assert!(!service.cache.is_enabled());
    assert!(service.cache.is_empty());

    Ok(())
}

/// Test that the service reports the provider behind it
#[tokio::test]
async fn test_testConnection_shouldFollowProvider() {
    assert!(service_with(&MockProvider::working()).test_connection().await.is_ok());
    assert!(service_with(&MockProvider::failing()).test_connection().await.is_err());
    assert_eq!(service_with(&MockProvider::working()).provider_name(), "Mock");
}

/// Test cache keys and counters
#[test]
fn test_translationCache_shouldSeparateLanguagePairs() {
    let cache = TranslationCache::new(true);
    cache.store("Chair", "en", "fr", "Chaise");

    assert_eq!(cache.get("Chair", "en", "fr").as_deref(), Some("Chaise"));
    assert_eq!(cache.get("Chair", "en", "de"), None);
    assert_eq!(cache.get("chair", "en", "fr"), None);
    assert_eq!(cache.len(), 1);

    let (hits, misses, hit_rate) = cache.stats();
    assert_eq!((hits, misses), (1, 2));
    assert!((hit_rate - 1.0 / 3.0).abs() < f64::EPSILON);
}

/// Test that clones of the service share one cache
#[tokio::test]
async fn test_clonedService_shouldShareCache() -> Result<()> {
    let mock = MockProvider::working();
    let service = service_with(&mock);
    let cloned = service.clone();

    service.translate_text("Lamp", "en", "fr").await?;
    cloned.translate_text("Lamp", "en", "fr").await?;

    assert_eq!(mock.request_count(), 1);
    assert_eq!(cloned.cache.len(), 1);

    Ok(())
}

/// Test that the batch translator reuses cached segments
#[tokio::test]
async fn test_batchTranslator_withCachedSegments_shouldOnlySendMissing() -> Result<()> {
    let mock = MockProvider::working();
    let service = service_with(&mock);
    service.cache.store("one", "en", "fr", "un");

    let translator = BatchTranslator::new(service);
    let segments = strings(&["one", "two"]);
    let result = translator.translate_segments(&segments, "en", "fr", |_, _| {}).await
        .map_err(|f| f.error)?;

    assert_eq!(result, vec!["un", "[French] two"]);
    assert_eq!(mock.request_count(), 1);

    Ok(())
}

/// Test that multi-line segments are translated on their own
#[tokio::test]
async fn test_batchTranslator_withMultilineSegment_shouldKeepLineBreaks() -> Result<()> {
    let mock = MockProvider::working();
    let translator = BatchTranslator::new(service_with(&mock));

    let segments = strings(&["first", "line one\nline two", "last"]);
    let result = translator.translate_segments(&segments, "en", "fr", |_, _| {}).await
        .map_err(|f| f.error)?;

    assert_eq!(result[1], "[French] line one\n[French] line two");
    assert_eq!(result[2], "[French] last");
    // One batch for the single-line segments, one for the multi-line one
    assert_eq!(mock.request_count(), 2);

    Ok(())
}

/// Test that the character limit splits batches
#[test]
fn test_planBatches_withCharacterLimit_shouldSplit() {
    let mut config = get_test_config();
    config.active_provider_config_mut().max_chars_per_request = 12;
    let translator = BatchTranslator::new(TranslationService::with_provider(config, Arc::new(MockProvider::working())));

    let segments = strings(&["aaaa", "bbbb", "cccc", "dd"]);
    let batches = translator.plan_batches(&segments, &[0, 1, 2, 3]);

    let indices: Vec<Vec<usize>> = batches.into_iter().map(|b| b.indices).collect();
    assert_eq!(indices, vec![vec![0, 1], vec![2, 3]]);
}

/// Test that a JSON cell exposes keys and values according to its mode
#[test]
fn test_cellKind_json_withBothModes_shouldRebuildObject() {
    let config = JsonFieldConfig::parse("attrs:both").unwrap();
    let kind = CellKind::Json(&config);
    let value = r#"{"color":"red","size":3,"manual":"https://example.com/m.pdf"}"#;

    let segments = kind.segments(value);
    assert_eq!(segments, vec!["color", "red", "size", "manual"]);

    let translations: HashMap<String, String> = [("color", "couleur"), ("red", "rouge"), ("size", "taille")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    assert_eq!(
        kind.rebuild(value, &translations),
        r#"{"couleur":"rouge","taille":3,"manual":"https://example.com/m.pdf"}"#
    );
}

/// Test that keys translated to the same text are all kept
#[test]
fn test_cellKind_json_withCollidingKeyTranslations_shouldKeepEveryEntry() {
    let config = JsonFieldConfig::parse("attrs:keys").unwrap();
    let kind = CellKind::Json(&config);
    let value = r#"{"Colour":"red","Color":"blue"}"#;

    let translations: HashMap<String, String> = [("Colour", "Couleur"), ("Color", "Couleur")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    assert_eq!(kind.rebuild(value, &translations), r#"{"Couleur":"red","Color":"blue"}"#);
}

/// Test that malformed JSON cells are left alone
#[test]
fn test_cellKind_json_withMalformedValue_shouldKeepCell() {
    let config = JsonFieldConfig::parse("attrs:values").unwrap();
    let kind = CellKind::Json(&config);

    assert!(kind.segments("{not json").is_empty());
    assert_eq!(kind.rebuild("{not json", &HashMap::new()), "{not json");
    assert!(kind.segments("plain text").is_empty());
}

/// Test set cells with a custom separator
#[test]
fn test_cellKind_set_withPipeSeparator_shouldRejoinWithSeparator() {
    let kind = CellKind::Set { separator: "|" };
    let segments = kind.segments("oak | pine|");
    assert_eq!(segments, vec!["oak", "pine"]);

    let translations: HashMap<String, String> = [("oak", "chêne"), ("pine", "pin")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert_eq!(kind.rebuild("oak | pine|", &translations), "chêne|pin|");
}

/// Test response parsing
#[test]
fn test_parseBatchResponse_withFencesAndCrlf_shouldReturnLines() -> Result<()> {
    let response = "```\r\nun\r\ndeux\r\n```";
    assert_eq!(parse_batch_response(response, 2)?, vec!["un", "deux"]);

    assert!(matches!(
        parse_batch_response("un\ndeux\ntrois", 2),
        Err(TranslationError::CountMismatch { expected: 2, got: 3 })
    ));
    assert!(matches!(
        parse_batch_response("un\n\ndeux", 3),
        Err(TranslationError::CountMismatch { expected: 3, got: 2 })
    ));

    assert_eq!(parse_single_response("  bonjour\nle monde \n")?, "bonjour\nle monde");
    assert!(parse_single_response("   ").is_err());
    assert_eq!(batch_prompt(&["a", "b"]), "a\nb");

    Ok(())
}

/// Test retry delay computation
#[test]
fn test_backoffDelay_withRetryAfterHint_shouldUseLargerDelay() {
    assert_eq!(backoff_delay(500, 1, None), Duration::from_millis(1000));
    assert_eq!(backoff_delay(500, 1, Some(2)), Duration::from_secs(2));
    assert_eq!(backoff_delay(500, 1, Some(3600)), Duration::from_secs(30));
}

/// Test token usage accounting
#[test]
fn test_tokenUsageStats_shouldAccumulateAndSummarize() {
    let mut stats = TokenUsageStats::with_provider_info("Mock".to_string(), "test-model".to_string());
    stats.add_token_usage(Some(100), Some(40), Duration::from_millis(200));
    stats.add_token_usage(None, None, Duration::from_millis(50));

    assert_eq!(stats.requests, 2);
    assert_eq!(stats.prompt_tokens, 100);
    assert_eq!(stats.total_tokens, 140);

    let summary = stats.summary();
    assert!(summary.contains("Provider: Mock"));
    assert!(summary.contains("Requests: 2"));
    assert!(summary.contains("Total tokens: 140"));
}
