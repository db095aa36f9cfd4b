/*!
 * Common test utilities for the csv-translate test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use tempfile::TempDir;

use csv_translate::app_config::{Config, OutputLayout};
use csv_translate::app_controller::Controller;
use csv_translate::providers::mock::MockProvider;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a small product catalog CSV for testing
pub fn create_test_csv(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = "\
id,title,description,price
1,Chair,A comfortable chair,49.90
2,Table,\"Solid oak table, seats six\",199.00
3,Lamp,,15.50
";
    create_test_file(dir, filename, content)
}

/// Configuration for in-place translation of `columns` with fast retries,
/// no rate limit and a dummy API key
pub fn test_config(columns: &[&str], targets: &[&str]) -> Config {
    let mut config = Config::default();
    config.source_language = "en-US".to_string();
    config.target_languages = targets.iter().map(|t| t.to_string()).collect();
    config.columns.text_columns = columns.iter().map(|c| c.to_string()).collect();
    config.output.layout = OutputLayout::InPlace;

    config.translation.common.retry_backoff_ms = 1;
    let provider_config = config.translation.active_provider_config_mut();
    provider_config.api_key = "test-key".to_string();
    provider_config.rate_limit = None;

    config
}

/// Controller around a mock provider, without progress bars
pub fn test_controller(config: Config, mock: &MockProvider) -> Controller {
    Controller::with_provider(config, Arc::new(mock.clone())).without_progress()
}

/// Read a whole file as a string
pub fn read_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}
