// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use clap::{Args, Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use csv_translate::app_config::{self, Config, JsonFieldConfig, OutputLayout, TranslationProvider};
use csv_translate::app_controller::Controller;
use csv_translate::validation::{
    self, FieldValidator, FileValidator, Severity, TableValidator, ValidationEngine,
};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for OutputLayout to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOutputLayout {
    InPlace,
    LanguageColumns,
}

impl From<CliOutputLayout> for OutputLayout {
    fn from(cli_layout: CliOutputLayout) -> Self {
        match cli_layout {
            CliOutputLayout::InPlace => OutputLayout::InPlace,
            CliOutputLayout::LanguageColumns => OutputLayout::LanguageColumns,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate text columns of a CSV file (default command)
    Translate(TranslateArgs),

    /// Check a CSV file for structural problems
    Validate(ValidateArgs),

    /// Generate shell completions for csv-translate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input CSV file
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output CSV file (default: <input stem>_translated.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code (e.g. 'en-US')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code, repeat for several (e.g. -t fr-FR -t de-DE)
    #[arg(short, long = "target-language")]
    target_languages: Vec<String>,

    /// Column to translate, repeat for several
    #[arg(short = 'c', long = "column")]
    columns: Vec<String>,

    /// Column never to translate
    #[arg(long = "exclude")]
    exclude_columns: Vec<String>,

    /// Column holding separator-delimited values translated one by one
    #[arg(long = "set-column")]
    set_columns: Vec<String>,

    /// JSON object column, as COLUMN[:keys|values|both]
    #[arg(long = "json-field")]
    json_fields: Vec<String>,

    /// Where translations go
    #[arg(long, value_enum)]
    layout: Option<CliOutputLayout>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the provider
    #[arg(long, env = "CSV_TRANSLATE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Segments per request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum concurrent requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// CSV field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Check that the provider answers before translating
    #[arg(long)]
    check_connection: bool,

    /// Configuration file path
    #[arg(long = "config", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// CSV file to check
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Column that must be present
    #[arg(long = "require")]
    required_columns: Vec<String>,

    /// Report empty cells as errors
    #[arg(long)]
    no_missing: bool,

    /// Do not warn about repeated rows
    #[arg(long)]
    allow_duplicates: bool,

    /// Column whose cells must not be empty
    #[arg(long = "non-empty")]
    non_empty: Vec<String>,

    /// Pattern rule, as COLUMN=REGEX
    #[arg(long = "pattern")]
    patterns: Vec<String>,

    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Separator between field and language in column names (title.en-US)
    #[arg(long, default_value = ".")]
    field_separator: String,

    /// Separator between language and region in column names (en-US)
    #[arg(long, default_value = "-")]
    language_separator: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// csv-translate - translate CSV text columns with AI
///
/// Reads a CSV file, translates the configured text columns with an LLM
/// provider (OpenAI, Anthropic, Ollama, LM Studio) and writes a new CSV file
/// with the same rows and columns.
#[derive(Parser, Debug)]
#[command(name = "csv-translate")]
#[command(version)]
#[command(about = "AI-powered CSV column translation tool")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "csv-translate translates the text columns of a CSV file using AI providers.

EXAMPLES:
    csv-translate products.csv -c description -t fr-FR        # Translate one column to French
    csv-translate products.csv -c title -c body -t fr-FR -t de-DE
                                                               # One output file per language
    csv-translate products.csv --layout language-columns -s en-US
                                                               # Fill title.fr-FR from title.en-US
    csv-translate products.csv -c tags --set-column tags       # Translate comma-separated values
    csv-translate products.csv -c attrs --json-field attrs:both # Translate JSON keys and values
    csv-translate -p ollama -m llama3.2:3b products.csv -c title -t es-ES
    csv-translate validate products.csv --require title --no-missing
    csv-translate completions bash > csv-translate.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. Command line options override the file.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (requires API key, OPENAI_API_KEY)
    anthropic - Anthropic Claude API (requires API key, ANTHROPIC_API_KEY)
    ollama    - Local Ollama server
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Trace is the ceiling; the effective level is set once the config is known
    if CustomLogger::init(LevelFilter::Trace).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "csv-translate", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Validate(args)) => run_validate(args),
        None => run_translate(cli.translate).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the config file, creating a default one when missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}

/// Override config values with the ones given on the command line
fn apply_cli_overrides(config: &mut Config, options: &TranslateArgs) -> Result<()> {
    if let Some(output) = &options.output {
        config.output.path = Some(output.clone());
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if !options.target_languages.is_empty() {
        config.target_languages = options.target_languages.clone();
    }
    if !options.columns.is_empty() {
        config.columns.text_columns = options.columns.clone();
    }
    config.columns.exclude_columns.extend(options.exclude_columns.iter().cloned());
    config.columns.set_columns.extend(options.set_columns.iter().cloned());
    for spec in &options.json_fields {
        let field = JsonFieldConfig::parse(spec)?;
        config.columns.json_fields.retain(|f| f.column != field.column);
        config.columns.json_fields.push(field);
    }
    if let Some(layout) = &options.layout {
        config.output.layout = layout.clone().into();
    }
    if let Some(delimiter) = options.delimiter {
        config.csv.delimiter = delimiter;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    // Provider settings
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(batch_size) = options.batch_size {
        config.translation.common.batch_size = batch_size;
    }

    let env_key = config.translation.provider.api_key_env_var()
        .and_then(|var| std::env::var(var).ok())
        .filter(|key| !key.is_empty());

    let provider_config = config.translation.active_provider_config_mut();
    if let Some(model) = &options.model {
        provider_config.model = model.clone();
    }
    if let Some(concurrency) = options.concurrency {
        provider_config.concurrent_requests = concurrency;
    }
    if let Some(api_key) = options.api_key.as_ref().filter(|key| !key.is_empty()) {
        provider_config.api_key = api_key.clone();
    } else if provider_config.api_key.is_empty() {
        if let Some(key) = env_key {
            provider_config.api_key = key;
        }
    }

    Ok(())
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let input = options.input.clone()
        .ok_or_else(|| anyhow!("INPUT is required when no subcommand is specified"))?;

    let mut config = load_or_create_config(&options.config_path)?;
    apply_cli_overrides(&mut config, &options)?;

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    log::set_max_level(level_filter(&config.log_level));

    let controller = Controller::with_config(config)?;
    if options.check_connection {
        controller.test_connection().await?;
        info!("Connection to {} OK", controller.config().translation.provider.display_name());
    }

    let written = controller.run(&input).await?;

    if written.is_empty() {
        warn!("No output file was written");
    }

    Ok(())
}

fn run_validate(options: ValidateArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let delimiter = u8::try_from(options.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| anyhow!("CSV delimiter must be an ASCII character, got '{}'", options.delimiter))?;

    let mut field_validator = FieldValidator::new();
    for column in &options.non_empty {
        field_validator.add_non_empty_rule(column);
    }
    for rule in &options.patterns {
        let (column, pattern) = rule.split_once('=')
            .ok_or_else(|| anyhow!("Invalid pattern rule '{}' (expected COLUMN=REGEX)", rule))?;
        field_validator.add_pattern_rule(column.trim(), pattern, Severity::Error)?;
    }

    let mut engine = ValidationEngine::new()
        .with_file_validator(FileValidator::new(options.delimiter))
        .with_table_validator(
            TableValidator::new()
                .require_columns(options.required_columns.clone())
                .separators(&options.field_separator, &options.language_separator)
                .allow_missing_values(!options.no_missing)
                .allow_duplicates(options.allow_duplicates),
        );
    if !field_validator.is_empty() {
        engine = engine.with_field_validator(field_validator);
    }

    let results = engine.validate_file(&options.input, delimiter);
    for result in &results {
        match result.severity {
            Severity::Error => error!("{}", result),
            Severity::Warning => warn!("{}", result),
            Severity::Info => info!("{}", result),
        }
    }

    let (errors, warnings, _) = validation::count_by_severity(&results);
    if errors > 0 {
        return Err(anyhow!(
            "Validation of {:?} failed: {} errors, {} warnings",
            options.input, errors, warnings
        ));
    }

    info!("Validation of {:?} passed ({} warnings)", options.input, warnings);
    Ok(())
}
