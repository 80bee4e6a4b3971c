//! Domain error types
//!
//! This module defines the error hierarchy for Porter.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Porter error type
///
/// This is the primary error type used throughout the application.
/// Run-aborting failures (window date parsing, unusable encryption keys)
/// surface as values of this type; per-unit and per-file failures are
/// recorded in the run aggregate instead of being propagated.
#[derive(Debug, Error)]
pub enum PorterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Errors raised by the source database driver
    #[error("Database error: {0}")]
    Database(String),

    /// File materialization errors
    #[error("Export error: {0}")]
    Export(String),

    /// Date expression could not be resolved
    #[error("Invalid date '{expression}' for format '{format}'")]
    DateParse { expression: String, format: String },

    /// Encryption stage errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// SFTP session and upload errors
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Mail composition or dispatch errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl PorterError {
    /// Whether this error belongs to the database-error class.
    ///
    /// Only database errors mark the export stage as unsuccessful; empty
    /// results and file-system failures do not.
    pub fn is_database(&self) -> bool {
        matches!(self, PorterError::Database(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PorterError {
    fn from(err: std::io::Error) -> Self {
        PorterError::Io(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PorterError {
    fn from(err: toml::de::Error) -> Self {
        PorterError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<tokio_postgres::Error> for PorterError {
    fn from(err: tokio_postgres::Error) -> Self {
        PorterError::Database(err.to_string())
    }
}

impl From<csv::Error> for PorterError {
    fn from(err: csv::Error) -> Self {
        PorterError::Export(format!("CSV write failed: {err}"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for PorterError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        PorterError::Export(format!("XLSX write failed: {err}"))
    }
}

impl From<ssh2::Error> for PorterError {
    fn from(err: ssh2::Error) -> Self {
        PorterError::Transfer(err.to_string())
    }
}
