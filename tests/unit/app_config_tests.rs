/*!
 * Tests for application configuration functionality
 */

use csv_translate::app_config::{
    Config, JsonFieldConfig, LogLevel, OutputLayout, ProviderConfig, TranslationConfig, TranslationProvider,
};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en-US");
    assert!(config.target_languages.is_empty());
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.output.layout, OutputLayout::InPlace);
    assert_eq!(config.output.suffix, "_translated");
    assert_eq!(config.csv.delimiter, ',');
    assert_eq!(config.csv.language_separator, "-");
    assert_eq!(config.csv.field_language_separator, ".");
    assert_eq!(config.log_level, LogLevel::Info);

    let openai = config.translation.get_provider_config(&TranslationProvider::OpenAI)
        .expect("OpenAI provider config should exist");
    assert_eq!(openai.concurrent_requests, 4);
    assert_eq!(openai.endpoint, "https://api.openai.com/v1");
    assert_eq!(openai.rate_limit, Some(60));
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    // Start with a valid config
    let mut config = common::test_config(&["description"], &["fr-FR"]);
    assert!(config.validate().is_ok());

    // Invalid source language
    config.source_language = "xx-XX".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en-US".to_string();

    // Invalid target language
    config.target_languages = vec!["fr-FR".to_string(), "zz".to_string()];
    assert!(config.validate().is_err());

    // Target equal to source
    config.target_languages = vec!["en-US".to_string()];
    assert!(config.validate().is_err());
    config.target_languages = vec!["fr-FR".to_string()];

    // In-place layout needs columns
    config.columns.text_columns.clear();
    assert!(config.validate().is_err());

    // ...but language columns do not
    config.output.layout = OutputLayout::LanguageColumns;
    assert!(config.validate().is_ok());
}

/// Test that only the in-place layout needs explicit target languages
#[test]
fn test_config_validation_withDefaultTargets_shouldDependOnLayout() {
    let mut config = common::test_config(&["description"], &[]);
    assert!(config.target_languages.is_empty());
    assert!(config.validate().is_err());

    config.output.layout = OutputLayout::LanguageColumns;
    assert!(config.validate().is_ok());
}

/// Test that providers requiring an API key are rejected without one
#[test]
fn test_config_validation_withMissingApiKey_shouldFailForRemoteProviders() {
    let mut config = common::test_config(&["description"], &["fr-FR"]);
    config.translation.active_provider_config_mut().api_key.clear();
    assert!(config.validate().is_err());

    // Local providers work without a key
    config.translation.provider = TranslationProvider::Ollama;
    assert!(config.validate().is_ok());
}

/// Test numeric settings validation
#[test]
fn test_config_validation_withBadNumbers_shouldFail() {
    let mut config = common::test_config(&["description"], &["fr-FR"]);
    config.translation.common.batch_size = 0;
    assert!(config.validate().is_err());

    let mut config = common::test_config(&["description"], &["fr-FR"]);
    config.translation.common.temperature = 3.5;
    assert!(config.validate().is_err());

    let mut config = common::test_config(&["description"], &["fr-FR"]);
    config.translation.active_provider_config_mut().concurrent_requests = 0;
    assert!(config.validate().is_err());

    let mut config = common::test_config(&["description"], &["fr-FR"]);
    config.csv.delimiter = '§';
    assert!(config.validate().is_err());
}

/// Test that a partial JSON config is completed with defaults
#[test]
fn test_config_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "source_language": "en-GB",
        "target_languages": ["de-DE", "es-ES"],
        "columns": { "text_columns": ["title"], "set_columns": ["tags"] },
        "output": { "layout": "language-columns" },
        "translation": { "provider": "ollama" }
    }"#;

    let config: Config = serde_json::from_str(json).expect("config should parse");
    assert_eq!(config.source_language, "en-GB");
    assert_eq!(config.target_languages.len(), 2);
    assert!(config.columns.is_set_column("tags"));
    assert_eq!(config.output.layout, OutputLayout::LanguageColumns);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.common.batch_size, 20);
    assert_eq!(config.csv.set_separator, ",");
    assert_eq!(config.translation.get_model(), "llama3.2:3b");
}

/// Test the round trip of a default config through JSON
#[test]
fn test_config_serialize_shouldRoundTrip() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.target_languages, config.target_languages);
    assert_eq!(parsed.translation.available_providers.len(), 4);
    assert!(json.contains("\"in-place\""));
}

/// Test JSON field specifications from the command line
#[test]
fn test_jsonFieldConfig_parse_withModes_shouldSetFlags() {
    let keys = JsonFieldConfig::parse("attributes").unwrap();
    assert_eq!(keys.column, "attributes");
    assert!(keys.translate_keys && !keys.translate_values);

    let values = JsonFieldConfig::parse("specs:values").unwrap();
    assert!(!values.translate_keys && values.translate_values);

    let both = JsonFieldConfig::parse("specs:BOTH").unwrap();
    assert!(both.translate_keys && both.translate_values);

    assert!(JsonFieldConfig::parse(":keys").is_err());
    assert!(JsonFieldConfig::parse("specs:all").is_err());
}

/// Test accessors of the active provider
#[test]
fn test_translationConfig_activeProvider_shouldResolveSettings() {
    let mut config = TranslationConfig::default();
    config.provider = TranslationProvider::Anthropic;

    assert_eq!(config.get_model(), "claude-3-haiku-20240307");
    assert_eq!(config.get_endpoint(), "https://api.anthropic.com");
    assert_eq!(config.get_timeout_secs(), 120);
    assert_eq!(config.get_rate_limit(), Some(45));

    // A provider missing from the list is added with defaults on mutable access
    config.available_providers.clear();
    config.active_provider_config_mut().model = "claude-custom".to_string();
    assert_eq!(config.get_model(), "claude-custom");
    assert_eq!(config.available_providers.len(), 1);
}

/// Test provider enum conversions
#[test]
fn test_translationProvider_fromStr_shouldParseKnownNames() {
    assert_eq!("OpenAI".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("lmstudio".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert!("deepl".parse::<TranslationProvider>().is_err());

    assert_eq!(TranslationProvider::LMStudio.display_name(), "LM Studio");
    assert_eq!(TranslationProvider::Anthropic.api_key_env_var(), Some("ANTHROPIC_API_KEY"));
    assert!(!TranslationProvider::Ollama.requires_api_key());
    assert_eq!(ProviderConfig::new(TranslationProvider::Ollama).provider_type, "ollama");
}
