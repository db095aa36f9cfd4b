// File-level checks: existence, encoding, header row and field counts.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::debug;

use super::{Location, ValidationResult};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Validates a CSV file before it is loaded
#[derive(Debug, Clone)]
pub struct FileValidator {
    delimiter: char,
}

impl FileValidator {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Run every file-level check. Stops at the first check that makes
    /// the remaining ones meaningless.
    pub fn validate(&self, path: &Path) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        if !path.exists() {
            results.push(ValidationResult::error("File does not exist", Location::file(path)));
            return results;
        }
        if !path.is_file() {
            results.push(ValidationResult::error("Path is not a file", Location::file(path)));
            return results;
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                results.push(ValidationResult::error(format!("Failed to read file: {}", e), Location::file(path)));
                return results;
            }
        };

        if let Err(e) = std::str::from_utf8(&bytes) {
            results.push(
                ValidationResult::error("File is not valid UTF-8", Location::file(path))
                    .with_context(format!("invalid byte at offset {}", e.valid_up_to()))
                    .with_fix("Re-save the file with UTF-8 encoding"),
            );
            return results;
        }

        let content = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => {
                results.push(
                    ValidationResult::warning("File starts with a UTF-8 byte order mark", Location::file(path))
                        .with_fix("Save the file as UTF-8 without BOM"),
                );
                rest
            }
            None => &bytes[..],
        };

        results.extend(self.validate_structure(path, content));
        results
    }

    fn validate_structure(&self, path: &Path, content: &[u8]) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        let Ok(delimiter) = u8::try_from(self.delimiter) else {
            results.push(ValidationResult::error(
                format!("Delimiter '{}' is not a single-byte character", self.delimiter),
                Location::file(path),
            ));
            return results;
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content);

        let mut records = reader.records();

        let headers = match records.next() {
            None => {
                results.push(ValidationResult::error("CSV file is empty", Location::file(path)));
                return results;
            }
            Some(Err(e)) => {
                results.push(ValidationResult::error(format!("CSV parsing error: {}", e), Location::file(path)));
                return results;
            }
            Some(Ok(record)) => record,
        };

        let header_names: Vec<&str> = headers.iter().collect();
        results.extend(Self::validate_headers(path, &header_names));

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    results.push(ValidationResult::error(
                        format!("CSV parsing error: {}", e),
                        Location::line(path, line),
                    ));
                    break;
                }
            };

            if record.len() != header_names.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                results.push(
                    ValidationResult::error(format!("Inconsistent number of fields on line {}", line), Location::line(path, line))
                        .with_context(format!("expected {}, found {}", header_names.len(), record.len())),
                );
                break;
            }
        }

        debug!("File validation of {:?}: {} issues", path, results.len());
        results
    }

    fn validate_headers(path: &Path, headers: &[&str]) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        let location = || Location::line(path, 1);

        let empty: Vec<String> = headers.iter()
            .enumerate()
            .filter(|(_, h)| h.trim().is_empty())
            .map(|(i, _)| (i + 1).to_string())
            .collect();
        if !empty.is_empty() {
            results.push(
                ValidationResult::error(format!("Empty column names at positions: {}", empty.join(", ")), location())
                    .with_fix("Give every column a name"),
            );
        }

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for header in headers.iter().filter(|h| !h.trim().is_empty()) {
            let key = header.to_lowercase();
            if !seen.insert(key) && !duplicates.contains(header) {
                duplicates.push(*header);
            }
        }
        if !duplicates.is_empty() {
            results.push(
                ValidationResult::error(format!("Duplicate column names: {}", duplicates.join(", ")), location())
                    .with_fix("Column names must be unique (case-insensitive)"),
            );
        }

        let spaced: Vec<&str> = headers.iter().copied().filter(|h| h.contains(' ')).collect();
        if !spaced.is_empty() {
            results.push(
                ValidationResult::error(format!("Column names contain spaces: {}", spaced.join(", ")), location())
                    .with_fix("Replace spaces with underscores"),
            );
        }

        results
    }
}
