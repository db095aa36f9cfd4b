// Table-level checks on a loaded CSV: required columns, naming, missing values, duplicates.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Location, ValidationResult};
use crate::table::Table;

static COLUMN_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid column name regex")
});

/// Validates the structure and content of a loaded table
#[derive(Debug, Clone)]
pub struct TableValidator {
    required_columns: Vec<String>,
    field_language_separator: String,
    language_separator: String,
    allow_duplicates: bool,
    allow_missing_values: bool,
}

impl Default for TableValidator {
    fn default() -> Self {
        Self {
            required_columns: Vec::new(),
            field_language_separator: ".".to_string(),
            language_separator: "-".to_string(),
            allow_duplicates: false,
            allow_missing_values: true,
        }
    }
}

impl TableValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_columns(mut self, columns: Vec<String>) -> Self {
        self.required_columns = columns;
        self
    }

    /// Separators of `<field><field_sep><lang><lang_sep><REGION>` column names
    pub fn separators(mut self, field_language_separator: &str, language_separator: &str) -> Self {
        self.field_language_separator = field_language_separator.to_string();
        self.language_separator = language_separator.to_string();
        self
    }

    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    pub fn allow_missing_values(mut self, allow: bool) -> Self {
        self.allow_missing_values = allow;
        self
    }

    pub fn validate(&self, table: &Table) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        self.check_required_columns(table, &mut results);
        self.check_column_names(table, &mut results);
        if !self.allow_missing_values {
            Self::check_missing_values(table, &mut results);
        }
        if !self.allow_duplicates {
            Self::check_duplicate_rows(table, &mut results);
        }

        results
    }

    fn check_required_columns(&self, table: &Table, results: &mut Vec<ValidationResult>) {
        let missing: Vec<&str> = self.required_columns.iter()
            .filter(|c| !table.has_column(c))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            results.push(
                ValidationResult::error(format!("Missing required columns: {}", missing.join(", ")), Location::table())
                    .with_fix("Add the missing columns to the header row"),
            );
        }
    }

    fn check_column_names(&self, table: &Table, results: &mut Vec<ValidationResult>) {
        for header in table.headers() {
            let (base, language) = match header.split_once(self.field_language_separator.as_str()) {
                Some((base, language)) => (base, Some(language)),
                None => (header.as_str(), None),
            };

            if !COLUMN_NAME_REGEX.is_match(base) {
                results.push(
                    ValidationResult::warning(format!("Invalid column name format: {}", header), Location::column(header))
                        .with_fix("Use letters, digits and underscores, starting with a letter"),
                );
            }

            if let Some(language) = language {
                if !self.is_language_region(language) {
                    results.push(
                        ValidationResult::warning(format!("Invalid language column format: {}", header), Location::column(header))
                            .with_fix(format!(
                                "Use {}{}ll{}RR, for example {}{}en{}US",
                                base, self.field_language_separator, self.language_separator,
                                base, self.field_language_separator, self.language_separator
                            )),
                    );
                }
            }
        }
    }

    // Two lowercase letters, the separator, two uppercase letters
    fn is_language_region(&self, code: &str) -> bool {
        let Some((language, region)) = code.split_once(self.language_separator.as_str()) else {
            return false;
        };
        language.len() == 2
            && language.chars().all(|c| c.is_ascii_lowercase())
            && region.len() == 2
            && region.chars().all(|c| c.is_ascii_uppercase())
    }

    fn check_missing_values(table: &Table, results: &mut Vec<ValidationResult>) {
        for (index, header) in table.headers().iter().enumerate() {
            let missing = table.column_values(index).filter(|v| v.trim().is_empty()).count();
            if missing > 0 {
                results.push(
                    ValidationResult::error(format!("Found {} missing values in column {}", missing, header), Location::column(header))
                        .with_fix("Fill in the empty cells"),
                );
            }
        }
    }

    fn check_duplicate_rows(table: &Table, results: &mut Vec<ValidationResult>) {
        let mut seen = HashSet::new();
        let duplicates = table.rows().iter().filter(|row| !seen.insert(row.values())).count();

        if duplicates > 0 {
            results.push(
                ValidationResult::warning(format!("Found {} duplicate rows", duplicates), Location::table())
                    .with_fix("Remove the repeated rows"),
            );
        }
    }
}
