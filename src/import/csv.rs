//! CSV parser adapter

use std::collections::HashMap;

use tracing::debug;

use super::{ImportError, ParsedCsv, RawUploadRow};

/// CSV importer
///
/// Reads a header row followed by data rows. Blank lines are skipped, short
/// rows are tolerated (missing cells are simply absent) and a UTF-8 byte
/// order mark on the first header is removed.
///
/// # Example
///
/// ```rust
/// use emigration_data_sdk::import::CsvImporter;
///
/// let parsed = CsvImporter::new().parse("year,male,female\n1981,\"1,200\",900\n").unwrap();
/// assert_eq!(parsed.headers, vec!["year", "male", "female"]);
/// assert_eq!(parsed.rows[0].get("male"), Some("1,200"));
/// ```
#[derive(Debug, Clone)]
pub struct CsvImporter {
    delimiter: u8,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvImporter {
    /// Create a new comma-delimited importer
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different single-byte delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse upload text into headers and rows
    pub fn parse(&self, content: &str) -> Result<ParsedCsv, ImportError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(to_import_error)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ImportError::Empty);
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(to_import_error)?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let mut values = HashMap::with_capacity(headers.len());
            for (header, cell) in headers.iter().zip(record.iter()) {
                values
                    .entry(header.clone())
                    .or_insert_with(|| cell.to_string());
            }
            rows.push(RawUploadRow { line, values });
        }

        debug!(
            "Parsed CSV with {} column(s) and {} row(s)",
            headers.len(),
            rows.len()
        );
        Ok(ParsedCsv { headers, rows })
    }
}

fn to_import_error(err: ::csv::Error) -> ImportError {
    let line = err.position().map(|p| p.line());
    match err.kind() {
        ::csv::ErrorKind::Io(io) => ImportError::IoError(io.to_string()),
        _ => ImportError::ParseError {
            line,
            message: err.to_string(),
        },
    }
}
