/*!
 * Tests for the provider abstraction and the mock provider
 */

use csv_translate::app_config::{TranslationConfig, TranslationProvider};
use csv_translate::providers::mock::{MockBehavior, MockProvider};
use csv_translate::providers::openai::{OpenAI, OpenAIRequest};
use csv_translate::providers::{create_provider, CompletionRequest, Provider};

fn request(text: &str) -> CompletionRequest {
    CompletionRequest::new("You are a professional translator from English to Spanish.", text)
}

/// Test the completion request builder
#[test]
fn test_completionRequest_builder_shouldSetSampling() {
    let request = CompletionRequest::new("system", "user");
    assert_eq!(request.temperature, 0.3);
    assert_eq!(request.max_tokens, 2048);

    let request = request.temperature(0.0).max_tokens(64);
    assert_eq!(request.temperature, 0.0);
    assert_eq!(request.max_tokens, 64);
    assert_eq!(request.system, "system");
    assert_eq!(request.user, "user");
}

/// Test that every configured provider can be built
#[test]
fn test_createProvider_withEachProvider_shouldUseDisplayName() {
    let cases = [
        (TranslationProvider::OpenAI, "OpenAI"),
        (TranslationProvider::Anthropic, "Anthropic"),
        (TranslationProvider::Ollama, "Ollama"),
        (TranslationProvider::LMStudio, "LM Studio"),
    ];

    for (provider, name) in cases {
        let mut config = TranslationConfig::default();
        config.provider = provider;
        config.active_provider_config_mut().api_key = "test-key".to_string();

        let built = create_provider(&config).unwrap();
        assert_eq!(built.name(), name);
    }
}

/// Test that a bad Ollama endpoint is rejected when the provider is built
#[test]
fn test_createProvider_withInvalidOllamaEndpoint_shouldFail() {
    let mut config = TranslationConfig::default();
    config.provider = TranslationProvider::Ollama;
    config.active_provider_config_mut().endpoint = "http://".to_string();

    assert!(create_provider(&config).is_err());
}

/// Test the default mock translation format
#[tokio::test]
async fn test_mockProvider_working_shouldTagTargetLanguage() {
    let provider = MockProvider::working();

    let response = provider.complete(request("Good morning")).await.unwrap();

    assert_eq!(response.text, "[Spanish] Good morning");
    assert!(response.prompt_tokens.is_some());
    assert_eq!(provider.name(), "Mock");
}

/// Test the empty and slow behaviors
#[tokio::test]
async fn test_mockProvider_emptyAndSlow_shouldBehaveAsConfigured() {
    let empty = MockProvider::empty();
    assert_eq!(empty.complete(request("Hi")).await.unwrap().text, "");

    let slow = MockProvider::slow(20);
    let start = std::time::Instant::now();
    let response = slow.complete(request("Hi")).await.unwrap();
    assert!(start.elapsed() >= std::time::Duration::from_millis(20));
    assert_eq!(response.text, "[Spanish] Hi");
}

/// Test connection checks of the mock
#[tokio::test]
async fn test_mockProvider_testConnection_shouldFailOnlyWhenFailing() {
    assert!(MockProvider::working().test_connection().await.is_ok());
    assert!(MockProvider::transient(5).test_connection().await.is_ok());
    assert!(MockProvider::failing().test_connection().await.is_err());
}

/// Test that intermittent failures are transient
#[tokio::test]
async fn test_mockProvider_intermittent_shouldReturnTransientErrors() {
    let provider = MockProvider::new(MockBehavior::Intermittent { fail_every: 1 });

    let error = provider.complete(request("Hi")).await.unwrap_err();
    assert!(error.is_transient());
    assert_eq!(provider.request_count(), 1);
}

/// Test building an OpenAI-compatible client for a local server
#[test]
fn test_openai_forLocalServer_shouldBuildWithoutNetwork() {
    let client = OpenAI::new("", "http://localhost:1234/v1", "local-model", std::time::Duration::from_secs(1));
    assert!(client.is_ok());

    let body = OpenAIRequest::new("local-model").add_message("user", "ping");
    assert_eq!(serde_json::to_value(&body).unwrap()["model"], "local-model");
}

/// Test the OpenAI provider against the real API
#[tokio::test]
#[ignore]
async fn test_openai_provider_withValidApiKey_shouldComplete() {
    // This test should only run if an API key is provided
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        return;
    }

    let mut config = TranslationConfig::default();
    config.active_provider_config_mut().api_key = api_key;
    let provider = create_provider(&config).unwrap();

    let response = provider.complete(request("Hello").max_tokens(20)).await.unwrap();
    assert!(!response.text.is_empty());
    println!("OpenAI response: {}", response.text);
}

/// Test the Anthropic provider against the real API
#[tokio::test]
#[ignore]
async fn test_anthropic_provider_withValidApiKey_shouldComplete() {
    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        return;
    }

    let mut config = TranslationConfig::default();
    config.provider = TranslationProvider::Anthropic;
    config.active_provider_config_mut().api_key = api_key;
    let provider = create_provider(&config).unwrap();

    let response = provider.complete(request("Hello").max_tokens(20)).await.unwrap();
    assert!(!response.text.is_empty());
    println!("Anthropic response: {}", response.text);
}
