//! CLI command implementations

pub mod records;
pub mod schemas;
pub mod summary;
pub mod upload;
pub mod validate;

use std::io::Read;
use std::path::PathBuf;

use serde::Serialize;

use crate::cli::error::CliError;
use crate::config::{SdkConfig, StoreBackend};
use crate::models::DatasetSchema;
use crate::registry::SchemaRegistry;
use crate::storage::api::ApiRecordStore;
use crate::storage::filesystem::{FileFingerprintStore, FileSystemRecordStore};
use crate::storage::memory::{MemoryFingerprintStore, MemoryRecordStore};
use crate::storage::{FingerprintStore, RecordStore};

/// Stores and schemas resolved from configuration
pub struct CliContext {
    pub config: SdkConfig,
    pub registry: SchemaRegistry,
    pub records: Box<dyn RecordStore>,
    pub fingerprints: Box<dyn FingerprintStore>,
}

impl CliContext {
    pub fn from_config(config: SdkConfig) -> Result<Self, CliError> {
        let registry = config.registry()?;
        let records: Box<dyn RecordStore> = match config.store.backend {
            StoreBackend::Filesystem => Box::new(FileSystemRecordStore::new(&config.store.base_path)),
            StoreBackend::Api => {
                let base_url = config.store.base_url.clone().ok_or_else(|| {
                    CliError::InvalidArgument("api store backend requires base_url".to_string())
                })?;
                Box::new(ApiRecordStore::new(base_url, config.store.auth_token.clone()))
            }
            StoreBackend::Memory => Box::new(MemoryRecordStore::new()),
        };
        let fingerprints: Box<dyn FingerprintStore> = match config.store.backend {
            StoreBackend::Memory => Box::new(MemoryFingerprintStore::new()),
            _ => Box::new(FileFingerprintStore::new(&config.fingerprints.path)),
        };

        Ok(Self {
            config,
            registry,
            records,
            fingerprints,
        })
    }

    /// Resolve a dataset by name or collection
    pub fn schema(&self, dataset: &str) -> Result<&DatasetSchema, CliError> {
        self.registry
            .get(dataset)
            .ok_or_else(|| CliError::UnknownDataset(dataset.to_string()))
    }
}

/// Load input content from file or stdin
pub fn load_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        // Read from stdin
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(content)
    } else {
        // Read from file
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Parse `field=value` pairs given on the command line
pub fn parse_assignments(pairs: &[String]) -> Result<Vec<(String, String)>, CliError> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(field, value)| (field.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("Expected field=value, got '{}'", pair))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        let pairs = vec!["male = 1,200".to_string(), "female=3".to_string()];
        let parsed = parse_assignments(&pairs).unwrap();
        assert_eq!(parsed[0], ("male".to_string(), "1,200".to_string()));
        assert_eq!(parsed[1], ("female".to_string(), "3".to_string()));

        assert!(parse_assignments(&["male".to_string()]).is_err());
    }

    #[test]
    fn test_memory_context_resolves_schemas() {
        let config = SdkConfig::from_toml_str("[store]\nbackend = \"memory\"\n").unwrap();
        let context = CliContext::from_config(config).unwrap();
        assert_eq!(context.schema("civilStatus").unwrap().name, "civil_status");
        assert!(matches!(context.schema("weather"), Err(CliError::UnknownDataset(_))));
    }
}
