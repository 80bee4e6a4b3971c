//! Artifacts produced during a run
//!
//! Artifacts are created by the export and encryption stages and are never
//! mutated afterwards. The transfer stage either relocates them to backup or
//! leaves them in the working directory.

use crate::domain::{PorterError, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Suffix appended to encrypted artifacts
pub const ENCRYPTED_SUFFIX: &str = ".gpg";

/// Output file format, selected by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Delimited text with the configured separator
    Csv,
    /// Delimited text, tab-separated unless a separator is configured
    Txt,
    /// Native spreadsheet
    Xlsx,
}

impl FileFormat {
    /// Extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Txt => "txt",
            FileFormat::Xlsx => "xlsx",
        }
    }

    /// Whether this is the spreadsheet format
    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, FileFormat::Xlsx)
    }
}

impl FromStr for FileFormat {
    type Err = PorterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "txt" => Ok(FileFormat::Txt),
            "xlsx" => Ok(FileFormat::Xlsx),
            other => Err(PorterError::Export(format!(
                "Unsupported file format: {other}. Supported formats are xlsx, csv, txt"
            ))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A file materialized by the export stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedArtifact {
    /// File name (no directory)
    pub file_name: String,

    /// Absolute or working-directory-relative path
    pub path: PathBuf,

    /// Number of data rows written (header excluded); `None` when a
    /// procedure wrote the file itself
    pub row_count: Option<usize>,

    /// Format of the file
    pub format: FileFormat,
}

/// An encrypted sibling of an exported file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncryptedArtifact {
    /// Path of the plaintext original
    pub source: PathBuf,

    /// Path of the ciphertext (`source` + [`ENCRYPTED_SUFFIX`])
    pub path: PathBuf,
}

impl EncryptedArtifact {
    /// Pair a plaintext file with its encrypted sibling path
    pub fn for_source(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let path = encrypted_path(&source);
        Self { source, path }
    }
}

/// Append the encrypted marker to a path
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(ENCRYPTED_SUFFIX);
    PathBuf::from(raw)
}

/// Strip the encrypted marker from a file name, if present
pub fn strip_encrypted_suffix(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(ENCRYPTED_SUFFIX)
        .filter(|stem| !stem.is_empty())
}
