//! Error types for the upload pipeline

use thiserror::Error;

use crate::import::ImportError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

/// Errors that can occur while processing an upload
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The same content was uploaded to this collection before
    #[error("This file was already uploaded (digest {digest})")]
    DuplicateUpload { digest: String },

    /// A store call failed part way through applying the plan
    #[error(
        "Upload stopped after {records_completed} of {records_total} record(s) were written: {cause}"
    )]
    PersistenceFailure {
        #[source]
        cause: StorageError,
        records_completed: usize,
        records_total: usize,
    },
}

impl PipelineError {
    /// Whether this error only reports a condition the caller may override
    pub fn is_advisory(&self) -> bool {
        matches!(self, PipelineError::DuplicateUpload { .. })
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::UnknownDataset(name) => format!(
                "Unknown dataset '{}'\n\nHint: Run `emigration-cli schemas` to list the available datasets.",
                name
            ),
            PipelineError::Import(e) => e.user_message(),
            PipelineError::Validation(e) => e.user_message(),
            PipelineError::DuplicateUpload { .. } => format!(
                "{}\n\nHint: Pass --merge to add its counts to the existing records anyway.",
                self
            ),
            PipelineError::PersistenceFailure {
                records_completed, ..
            } if *records_completed > 0 => format!(
                "{}\n\nHint: The records already written stay in the store. Re-uploading the same file will add them again.",
                self
            ),
            _ => self.to_string(),
        }
    }
}
