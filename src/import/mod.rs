//! Import functionality
//!
//! Turns raw upload text into header-keyed rows. The parser adapter only
//! guarantees the row shape; dataset rules are applied later by the validator.

pub mod csv;

use std::collections::HashMap;

use serde::Serialize;

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Parse error{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    ParseError { line: Option<u64>, message: String },
    #[error("Upload is empty: no header row found")]
    Empty,
    #[error("IO error: {0}")]
    IoError(String),
}

impl ImportError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ImportError::Empty => {
                "The uploaded file is empty.\n\nHint: The first line must be a header row.".to_string()
            }
            ImportError::ParseError { .. } => {
                format!("{self}\n\nHint: Check that the file is valid comma-separated text.")
            }
            _ => self.to_string(),
        }
    }
}

/// One CSV line as a mapping from raw header to raw value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawUploadRow {
    /// 1-based line number in the source text
    pub line: u64,
    pub values: HashMap<String, String>,
}

impl RawUploadRow {
    /// Raw value under an exact header, if the row has that cell
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(String::as_str)
    }
}

/// Result of parsing an upload
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedCsv {
    /// Header row in file order
    pub headers: Vec<String>,
    /// Non-blank data rows in file order
    pub rows: Vec<RawUploadRow>,
}

impl ParsedCsv {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub use self::csv::CsvImporter;
