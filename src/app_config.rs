use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::language_utils;

// Application configuration: loading defaults, validating and merging settings.

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO, optionally with a region: `en-US`)
    pub source_language: String,

    /// Target language codes
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    /// Which columns get translated and how
    #[serde(default)]
    pub columns: ColumnConfig,

    /// CSV dialect and separators
    #[serde(default)]
    pub csv: CsvConfig,

    /// Where and how results are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Translation config
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Column selection
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ColumnConfig {
    /// Columns to translate. In the language-columns layout these are base
    /// field names and an empty list means every field with a source column.
    #[serde(default)]
    pub text_columns: Vec<String>,

    /// Columns (or base fields) never translated
    #[serde(default)]
    pub exclude_columns: Vec<String>,

    /// Columns holding separator-delimited values translated element by element
    #[serde(default)]
    pub set_columns: Vec<String>,

    /// Columns holding JSON objects
    #[serde(default)]
    pub json_fields: Vec<JsonFieldConfig>,
}

impl ColumnConfig {
    /// JSON settings for a column, if it is a JSON column
    pub fn json_field(&self, column: &str) -> Option<&JsonFieldConfig> {
        self.json_fields.iter().find(|f| f.column == column)
    }

    /// Whether the column holds separator-delimited values
    pub fn is_set_column(&self, column: &str) -> bool {
        self.set_columns.iter().any(|c| c == column)
    }

    /// Whether the column is excluded from translation
    pub fn is_excluded(&self, column: &str) -> bool {
        self.exclude_columns.iter().any(|c| c == column)
    }
}

/// What to translate inside a JSON cell
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JsonFieldConfig {
    /// Column (or base field) name
    pub column: String,

    /// Translate object keys
    #[serde(default = "default_true")]
    pub translate_keys: bool,

    /// Translate string values
    #[serde(default)]
    pub translate_values: bool,
}

impl JsonFieldConfig {
    /// Parse `column[:keys|values|both]`
    pub fn parse(spec: &str) -> Result<Self> {
        let (column, mode) = match spec.split_once(':') {
            Some((column, mode)) => (column.trim(), mode.trim().to_lowercase()),
            None => (spec.trim(), "keys".to_string()),
        };

        if column.is_empty() {
            return Err(anyhow!("JSON field specification has no column name: '{}'", spec));
        }

        let (translate_keys, translate_values) = match mode.as_str() {
            "keys" => (true, false),
            "values" => (false, true),
            "both" => (true, true),
            _ => return Err(anyhow!("Invalid JSON field mode '{}' (expected keys, values or both)", mode)),
        };

        Ok(Self {
            column: column.to_string(),
            translate_keys,
            translate_values,
        })
    }
}

/// CSV dialect and the separators used inside cells and column names
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CsvConfig {
    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Separator between elements of a set column
    #[serde(default = "default_set_separator")]
    pub set_separator: String,

    /// Separator between language and region in a code (`en-US`)
    #[serde(default = "default_language_separator")]
    pub language_separator: String,

    /// Separator between field and language in a column name (`name.en-US`)
    #[serde(default = "default_field_language_separator")]
    pub field_language_separator: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            set_separator: default_set_separator(),
            language_separator: default_language_separator(),
            field_language_separator: default_field_language_separator(),
        }
    }
}

/// How translations are laid out in the output
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// Overwrite the text columns, one file per target language
    #[default]
    InPlace,
    /// Fill existing `<field><sep><lang>` columns in a single file
    LanguageColumns,
}

impl std::fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InPlace => write!(f, "in-place"),
            Self::LanguageColumns => write!(f, "language-columns"),
        }
    }
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Explicit output file
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Suffix appended to the input file stem when no path is given
    #[serde(default = "default_output_suffix")]
    pub suffix: String,

    /// Output layout
    #[serde(default)]
    pub layout: OutputLayout,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            suffix: default_output_suffix(),
            layout: OutputLayout::default(),
        }
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Ollama
    Ollama,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Environment variable conventionally holding the API key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama | Self::LMStudio => None,
        }
    }

    // @returns: Whether requests are rejected without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Max chars per request
    #[serde(default = "default_max_chars_per_request")]
    pub max_chars_per_request: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                max_chars_per_request: default_max_chars_per_request(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_openai_rate_limit(),
            },
            TranslationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                max_chars_per_request: default_anthropic_max_chars_per_request(),
                timeout_secs: default_anthropic_timeout_secs(),
                rate_limit: default_anthropic_rate_limit(),
            },
            TranslationProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                max_chars_per_request: default_max_chars_per_request(),
                timeout_secs: default_timeout_secs(),
                rate_limit: None,
            },
            TranslationProvider::LMStudio => Self {
                provider_type: "lmstudio".to_string(),
                model: default_lmstudio_model(),
                api_key: String::new(),
                endpoint: default_lmstudio_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                max_chars_per_request: default_max_chars_per_request(),
                timeout_secs: default_timeout_secs(),
                rate_limit: None,
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 2.0)
    /// Lower values make output more deterministic, higher values more creative
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens the provider may generate per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Number of text segments sent in one request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Reuse translations of identical text within a run
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            batch_size: default_batch_size(),
            cache_enabled: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_target_languages() -> Vec<String> {
    Vec::new()
}

fn default_delimiter() -> char {
    ','
}

fn default_set_separator() -> String {
    ",".to_string()
}

fn default_language_separator() -> String {
    "-".to_string()
}

fn default_field_language_separator() -> String {
    ".".to_string()
}

fn default_output_suffix() -> String {
    "_translated".to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_max_chars_per_request() -> usize {
    4000
}

fn default_anthropic_max_chars_per_request() -> usize {
    8000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_anthropic_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_batch_size() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional translator from {source_language} to {target_language}.\n\
     \n\
     IMPORTANT INSTRUCTIONS:\n\
     - Return translations line by line, maintaining EXACTLY the same number of lines as the input\n\
     - Each input line must correspond to exactly one output line\n\
     - NEVER split a line into multiple lines\n\
     - NEVER combine multiple lines into one\n\
     - Maintain all formatting, numbers, and special characters exactly as they appear\n\
     - Translate ONLY the text portions while preserving all other elements\n\
     - Do not add or remove any information\n\
     - Keep the same tone and formality level\n\
     - Preserve any technical terms or proper nouns\n\
     - Maintain any special formatting (e.g., HTML tags) from the original\n\
     - Do not add explanations or notes\n\
     - Do not include the original text\n\
     - Do not add quotation marks unless they exist in the original\n\
     - Do not translate anything between {{ and }}"
        .to_string()
}

fn default_openai_rate_limit() -> Option<u32> {
    Some(60) // 60 requests per minute by default
}

fn default_anthropic_rate_limit() -> Option<u32> {
    // Slightly below Anthropic's standard limit of 50 requests per minute
    Some(45)
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let separator = &self.csv.language_separator;

        // Validate languages
        language_utils::get_language_name(&language_utils::base_language(&self.source_language, separator))
            .map_err(|e| anyhow!("Invalid source language '{}': {}", self.source_language, e))?;

        if self.target_languages.is_empty() && self.output.layout == OutputLayout::InPlace {
            return Err(anyhow!("At least one target language is required for the in-place layout (use -t/--target-language)"));
        }

        for target in &self.target_languages {
            language_utils::get_language_name(&language_utils::base_language(target, separator))
                .map_err(|e| anyhow!("Invalid target language '{}': {}", target, e))?;

            if target == &self.source_language {
                return Err(anyhow!("Target language '{}' is the same as the source language", target));
            }
        }

        // Validate columns
        if self.output.layout == OutputLayout::InPlace && self.columns.text_columns.is_empty() {
            return Err(anyhow!("At least one text column is required for the in-place layout"));
        }

        if !self.csv.delimiter.is_ascii() {
            return Err(anyhow!("CSV delimiter must be an ASCII character, got '{}'", self.csv.delimiter));
        }

        if self.csv.set_separator.is_empty()
            || self.csv.language_separator.is_empty()
            || self.csv.field_language_separator.is_empty()
        {
            return Err(anyhow!("Separators must not be empty"));
        }

        // Validate translation settings
        let common = &self.translation.common;
        if common.batch_size == 0 {
            return Err(anyhow!("Batch size must be at least 1"));
        }

        if !(0.0..=2.0).contains(&common.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", common.temperature));
        }

        if self.translation.optimal_concurrent_requests() == 0 {
            return Err(anyhow!("Concurrent requests must be at least 1"));
        }

        // Validate API key for providers that need one
        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                self.translation.provider.display_name()
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en-US".to_string(),
            target_languages: default_target_languages(),
            columns: ColumnConfig::default(),
            csv: CsvConfig::default(),
            output: OutputConfig::default(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    pub fn optimal_concurrent_requests(&self) -> usize {
        // Check if the provider exists in the available_providers
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.concurrent_requests;
        }

        // Default fallback
        default_concurrent_requests()
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the active provider configuration, adding a default entry if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // Local providers don't use API keys
        String::new()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the max chars per request for the active provider
    pub fn get_max_chars_per_request(&self) -> usize {
        if let Some(provider_config) = self.get_active_provider_config() {
            if provider_config.max_chars_per_request > 0 {
                return provider_config.max_chars_per_request;
            }
        }

        // Default fallback
        default_max_chars_per_request()
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.rate_limit;
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::OpenAI => default_openai_rate_limit(),
            TranslationProvider::Anthropic => default_anthropic_rate_limit(),
            TranslationProvider::Ollama | TranslationProvider::LMStudio => None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        let mut config = Self {
            provider: TranslationProvider::default(),
            available_providers: Vec::new(),
            common: TranslationCommonConfig::default(),
        };

        // Add default providers
        config.available_providers.push(ProviderConfig::new(TranslationProvider::OpenAI));
        config.available_providers.push(ProviderConfig::new(TranslationProvider::Anthropic));
        config.available_providers.push(ProviderConfig::new(TranslationProvider::Ollama));
        config.available_providers.push(ProviderConfig::new(TranslationProvider::LMStudio));

        config
    }
}
