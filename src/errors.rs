/*!
 * Error types for the csv-translate application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from the API
        message: String,
        /// Delay requested by the provider, if any
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether a retry of the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) | Self::RateLimitExceeded { .. } => true,
            Self::ApiError { status_code, .. } => {
                *status_code >= 500 || *status_code == 408 || *status_code == 409
            }
            Self::RequestFailed(_) | Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }

    /// Delay hint sent back by the provider
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded { retry_after_secs, .. } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Errors that can occur while loading, checking or writing a CSV table
#[derive(Error, Debug)]
pub enum TableError {
    /// The file is unreadable or not well-formed CSV
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// File being read
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// The header does not match what the run needs
    #[error("Schema error: {0}")]
    Schema(String),

    /// The output file could not be written
    #[error("Failed to write {path}: {message}")]
    Write {
        /// File being written
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}

/// Location of a cell in the source table, used in error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    /// Zero-based data row index
    pub row: usize,
    /// Line of the record in the source file
    pub line: u64,
    /// Column name
    pub column: String,
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} (line {}), column '{}'", self.row + 1, self.line, self.column)
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Blank input is never sent to the provider
    #[error("Input text is empty")]
    EmptyInput,

    /// The provider returned a different number of lines than it was sent
    #[error("Expected {expected} translations, got {got}")]
    CountMismatch {
        /// Lines sent
        expected: usize,
        /// Lines received
        got: usize,
    },

    /// A failure tied to a specific cell
    #[error("Translation to '{language}' failed at {cell}: {source}")]
    Cell {
        /// Cell whose text could not be translated
        cell: CellRef,
        /// Target language of the failed request
        language: String,
        /// Underlying failure
        source: Box<TranslationError>,
    },
}

impl TranslationError {
    /// Attach a cell location to this error
    pub fn at_cell(self, cell: CellRef, language: impl Into<String>) -> Self {
        Self::Cell {
            cell,
            language: language.into(),
            source: Box::new(self),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from table loading or writing
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
