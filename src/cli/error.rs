//! CLI error types

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::import::ImportError;
use crate::pipeline::PipelineError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

/// Errors surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read file {}: {}", .0.display(), .1)]
    FileReadError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Aborted")]
    Aborted,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to write output: {0}")]
    Output(String),
}

impl CliError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CliError::UnknownDataset(name) => format!(
                "Unknown dataset '{}'\n\nHint: Run `emigration-cli schemas` to list the available datasets.",
                name
            ),
            CliError::Config(e) => e.user_message(),
            CliError::Import(e) => e.user_message(),
            CliError::Validation(e) => e.user_message(),
            CliError::Pipeline(e) => e.user_message(),
            CliError::Dataset(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}
