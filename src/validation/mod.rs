//! Validation functionality
//!
//! Provides validation logic for:
//! - Uploaded CSV batches (column resolution, key cardinality, lenient numeric normalization)
//! - Manually entered records (strict form validation)

pub mod form;
pub mod upload;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use form::{RecordForm, validate_form};
pub use upload::{UploadValidator, validate};

/// Errors that can occur during validation
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// None of the accepted key column spellings is present
    #[error("Missing key column '{key_field}' (accepted: {})", .accepted.join(", "))]
    MissingKeyColumn {
        key_field: String,
        accepted: Vec<String>,
    },

    /// One or more expected numeric columns are absent
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingNumericColumns(Vec<String>),

    /// Distinct key count does not match the schema
    #[error("Expected exactly {expected} distinct keys, found {actual}")]
    CardinalityMismatch { expected: usize, actual: usize },

    /// Key is empty in a manually entered record
    #[error("{0} cannot be empty")]
    EmptyKey(String),

    /// A manually entered numeric value is not a non-negative integer
    #[error("Invalid value for {field}: '{value}' is not a non-negative whole number")]
    InvalidNumber { field: String, value: String },

    /// A manually entered field is not part of the schema
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Several problems found in one pass
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Collapse a list of problems into a single error
    ///
    /// Returns `None` for an empty list.
    pub fn from_problems(mut problems: Vec<ValidationError>) -> Option<Self> {
        match problems.len() {
            0 => None,
            1 => problems.pop(),
            _ => Some(ValidationError::Multiple(problems)),
        }
    }

    /// Flatten into the individual problems
    pub fn problems(&self) -> Vec<&ValidationError> {
        match self {
            ValidationError::Multiple(all) => all.iter().flat_map(|e| e.problems()).collect(),
            other => vec![other],
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        let lines: Vec<String> = self
            .problems()
            .iter()
            .map(|p| format!("  - {p}"))
            .collect();
        format!(
            "Upload rejected:\n{}\n\nHint: Fix the listed columns or rows and upload again.",
            lines.join("\n")
        )
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_problems_collapses() {
        assert_eq!(ValidationError::from_problems(vec![]), None);

        let single = ValidationError::from_problems(vec![ValidationError::EmptyKey("year".into())]);
        assert_eq!(single, Some(ValidationError::EmptyKey("year".into())));

        let many = ValidationError::from_problems(vec![
            ValidationError::MissingNumericColumns(vec!["1981".into()]),
            ValidationError::CardinalityMismatch {
                expected: 14,
                actual: 2,
            },
        ])
        .unwrap();
        assert_eq!(many.problems().len(), 2);
        assert_eq!(
            many.to_string(),
            "Missing required columns: 1981; Expected exactly 14 distinct keys, found 2"
        );
    }
}
