// Per-column rules applied to every cell of a table.

use anyhow::{Context, Result};
use regex::Regex;

use super::{Location, Severity, ValidationResult};
use crate::table::Table;

/// What a rule checks in a cell
#[derive(Debug, Clone)]
pub enum RuleCheck {
    /// Cell must not be blank
    NonEmpty,
    /// Non-blank cells must match the pattern
    Pattern(Regex),
    /// Non-blank cells must be numbers within the bounds
    Range { min: Option<f64>, max: Option<f64> },
}

/// A rule for one column
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub check: RuleCheck,
    pub message: String,
    pub severity: Severity,
    pub suggested_fix: Option<String>,
}

impl FieldRule {
    /// Whether the cell value passes this rule
    pub fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        match &self.check {
            RuleCheck::NonEmpty => !value.is_empty(),
            RuleCheck::Pattern(_) | RuleCheck::Range { .. } if value.is_empty() => true,
            RuleCheck::Pattern(regex) => regex.is_match(value),
            RuleCheck::Range { min, max } => match value.parse::<f64>() {
                Ok(number) => min.is_none_or(|m| number >= m) && max.is_none_or(|m| number <= m),
                Err(_) => false,
            },
        }
    }
}

/// Validates cells against per-column rules
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    // Column name -> rules, in insertion order
    rules: Vec<(String, Vec<FieldRule>)>,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for a column
    pub fn add_rule(&mut self, column: &str, rule: FieldRule) {
        match self.rules.iter_mut().find(|(name, _)| name == column) {
            Some((_, rules)) => rules.push(rule),
            None => self.rules.push((column.to_string(), vec![rule])),
        }
    }

    pub fn add_non_empty_rule(&mut self, column: &str) {
        self.add_rule(column, FieldRule {
            check: RuleCheck::NonEmpty,
            message: "Value must not be empty".to_string(),
            severity: Severity::Error,
            suggested_fix: Some(format!("Fill in a value for {}", column)),
        });
    }

    /// Add a pattern rule; fails if the pattern is not a valid regex
    pub fn add_pattern_rule(&mut self, column: &str, pattern: &str, severity: Severity) -> Result<()> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid pattern for column {}: {}", column, pattern))?;

        self.add_rule(column, FieldRule {
            check: RuleCheck::Pattern(regex),
            message: format!("Value does not match pattern {}", pattern),
            severity,
            suggested_fix: None,
        });
        Ok(())
    }

    pub fn add_range_rule(&mut self, column: &str, min: Option<f64>, max: Option<f64>, severity: Severity) {
        let bounds = match (min, max) {
            (Some(min), Some(max)) => format!("between {} and {}", min, max),
            (Some(min), None) => format!("at least {}", min),
            (None, Some(max)) => format!("at most {}", max),
            (None, None) => "a number".to_string(),
        };

        self.add_rule(column, FieldRule {
            check: RuleCheck::Range { min, max },
            message: format!("Value must be {}", bounds),
            severity,
            suggested_fix: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// One result per failing cell and rule
    pub fn validate(&self, table: &Table) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        for (column, rules) in &self.rules {
            let Some(index) = table.column_index(column) else {
                results.push(ValidationResult::error(
                    format!("Column {} not found for field validation", column),
                    Location::column(column),
                ));
                continue;
            };

            for (row_index, row) in table.rows().iter().enumerate() {
                let value = row.get(index).unwrap_or("");
                for rule in rules.iter().filter(|rule| !rule.accepts(value)) {
                    let mut result = ValidationResult::new(
                        rule.severity,
                        rule.message.clone(),
                        Location::cell(row_index + 1, row.line(), column),
                    )
                    .with_context(format!("value: '{}'", value));
                    result.suggested_fix = rule.suggested_fix.clone();
                    results.push(result);
                }
            }
        }

        results
    }
}
