/*!
 * Structural validation of CSV files.
 *
 * Checks run in three levels, each optional:
 * - `file`: the file itself (existence, encoding, header, field counts)
 * - `table`: the loaded table (required columns, naming, missing values, duplicates)
 * - `field`: per-column rules applied to every cell
 *
 * `ValidationEngine` runs the configured levels in that order and stops after
 * file-level errors.
 */

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::table::Table;

pub mod field;
pub mod file;
pub mod table;

// Re-export main types
pub use field::{FieldRule, FieldValidator, RuleCheck};
pub use file::FileValidator;
pub use table::TableValidator;

/// Severity levels for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The file cannot be processed as is
    Error,
    /// Likely a problem, processing can continue
    Warning,
    /// Informational
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARNING"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// Where an issue was found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file: Option<PathBuf>,
    /// Line in the file, 1-based
    pub line: Option<u64>,
    /// Data row, 1-based
    pub row: Option<usize>,
    pub column: Option<String>,
}

impl Location {
    pub fn file(path: &Path) -> Self {
        Self { file: Some(path.to_path_buf()), ..Default::default() }
    }

    pub fn line(path: &Path, line: u64) -> Self {
        Self { file: Some(path.to_path_buf()), line: Some(line), ..Default::default() }
    }

    pub fn column(column: &str) -> Self {
        Self { column: Some(column.to_string()), ..Default::default() }
    }

    pub fn cell(row: usize, line: u64, column: &str) -> Self {
        Self {
            file: None,
            line: Some(line),
            row: Some(row),
            column: Some(column.to_string()),
        }
    }

    pub fn table() -> Self {
        Self::default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(file) = &self.file {
            parts.push(format!("file: {}", file.display()));
        }
        if let Some(line) = self.line {
            parts.push(format!("line: {}", line));
        }
        if let Some(row) = self.row {
            parts.push(format!("row: {}", row));
        }
        if let Some(column) = &self.column {
            parts.push(format!("column: {}", column));
        }

        if parts.is_empty() {
            write!(f, "table")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    /// Extra detail, such as the offending value
    pub context: Option<String>,
    pub suggested_fix: Option<String>,
}

impl ValidationResult {
    /// Create a result without context or fix
    pub fn new(severity: Severity, message: impl Into<String>, location: Location) -> Self {
        Self {
            severity,
            message: message.into(),
            location,
            context: None,
            suggested_fix: None,
        }
    }

    pub fn error(message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Error, message, location)
    }

    pub fn warning(message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Warning, message, location)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (at {})", self.severity, self.message, self.location)?;
        if let Some(context) = &self.context {
            write!(f, " [{}]", context)?;
        }
        if let Some(fix) = &self.suggested_fix {
            write!(f, " - fix: {}", fix)?;
        }
        Ok(())
    }
}

/// Whether any result is an error
pub fn has_errors(results: &[ValidationResult]) -> bool {
    results.iter().any(ValidationResult::is_error)
}

/// Count of (errors, warnings, infos)
pub fn count_by_severity(results: &[ValidationResult]) -> (usize, usize, usize) {
    results.iter().fold((0, 0, 0), |(e, w, i), r| match r.severity {
        Severity::Error => (e + 1, w, i),
        Severity::Warning => (e, w + 1, i),
        Severity::Info => (e, w, i + 1),
    })
}

/// Runs the configured validators in order: file, table, field
#[derive(Debug, Default)]
pub struct ValidationEngine {
    file_validator: Option<FileValidator>,
    table_validator: Option<TableValidator>,
    field_validator: Option<FieldValidator>,
}

impl ValidationEngine {
    /// An engine with no validators
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_validator(mut self, validator: FileValidator) -> Self {
        self.file_validator = Some(validator);
        self
    }

    pub fn with_table_validator(mut self, validator: TableValidator) -> Self {
        self.table_validator = Some(validator);
        self
    }

    pub fn with_field_validator(mut self, validator: FieldValidator) -> Self {
        self.field_validator = Some(validator);
        self
    }

    /// Validate a CSV file with every configured validator
    pub fn validate_file(&self, path: &Path, delimiter: u8) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        if let Some(validator) = &self.file_validator {
            let file_results = validator.validate(path);
            let stop = has_errors(&file_results);
            results.extend(file_results);

            if stop {
                debug!("File-level errors in {:?}, skipping table checks", path);
                return results;
            }
        }

        if self.table_validator.is_none() && self.field_validator.is_none() {
            return results;
        }

        match Table::load(path, delimiter) {
            Ok(table) => results.extend(self.validate_table(&table)),
            Err(e) => results.push(
                ValidationResult::error(format!("Failed to read CSV file: {}", e), Location::file(path)),
            ),
        }

        results
    }

    /// Validate an already loaded table (table and field levels)
    pub fn validate_table(&self, table: &Table) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        if let Some(validator) = &self.table_validator {
            results.extend(validator.validate(table));
        }

        if let Some(validator) = &self.field_validator {
            results.extend(validator.validate(table));
        }

        results
    }
}
