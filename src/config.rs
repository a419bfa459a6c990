//! SDK configuration
//!
//! Loaded from a TOML file. Every section is optional:
//!
//! ```toml
//! [store]
//! backend = "api"            # "filesystem" (default), "api" or "memory"
//! base_url = "https://records.example.com/v1"
//!
//! [fingerprints]
//! path = ".emigration/fingerprints.json"
//! max_age_days = 365         # omit to keep fingerprints forever
//!
//! [pipeline]
//! concurrency = 8
//!
//! [[datasets]]
//! name = "region"
//! collection = "region"
//! key_field = "region"
//! numeric_fields = [{ name = "2019" }, { name = "2020" }]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::RetentionPolicy;
use crate::models::DatasetSchema;
use crate::pipeline::{DEFAULT_CONCURRENCY, PipelineConfig};
use crate::registry::{RegistryError, SchemaRegistry};

/// Default configuration filename
pub const DEFAULT_CONFIG_NAME: &str = "emigration.toml";
/// Maximum allowed config file size in bytes
const MAX_CONFIG_FILE_SIZE: usize = 512 * 1024;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ConfigError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Io { path, .. } => format!(
                "{}\n\nHint: Create {} or pass --config with the path to your config file.",
                self,
                path.display()
            ),
            _ => self.to_string(),
        }
    }
}

/// Which record store backs the SDK
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Filesystem,
    Api,
    Memory,
}

/// `[store]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory for the filesystem backend
    pub base_path: PathBuf,
    /// Root URL for the API backend
    pub base_url: Option<String>,
    /// Bearer token passed to the API backend
    pub auth_token: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Filesystem,
            base_path: PathBuf::from(".emigration/data"),
            base_url: None,
            auth_token: None,
        }
    }
}

/// `[fingerprints]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Ledger file for the filesystem fingerprint store
    pub path: PathBuf,
    pub max_age_days: Option<u32>,
    pub max_entries: Option<usize>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".emigration/fingerprints.json"),
            max_age_days: None,
            max_entries: None,
        }
    }
}

impl FingerprintConfig {
    pub fn retention(&self) -> RetentionPolicy {
        match (self.max_age_days, self.max_entries) {
            (Some(days), _) => RetentionPolicy::MaxAgeDays(days),
            (None, Some(max)) => RetentionPolicy::MaxEntries(max),
            (None, None) => RetentionPolicy::Permanent,
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub concurrency: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Complete SDK configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fingerprints: FingerprintConfig,
    #[serde(default)]
    pub pipeline: PipelineSection,
    /// Extra or replacement dataset schemas
    #[serde(default)]
    pub datasets: Vec<DatasetSchema>,
}

impl SdkConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(
                "config file exceeds size limit".to_string(),
            ));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Api
            && self
                .store
                .base_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "api store backend requires base_url".to_string(),
            ));
        }
        if self.fingerprints.max_age_days.is_some() && self.fingerprints.max_entries.is_some() {
            return Err(ConfigError::Invalid(
                "set at most one of max_age_days and max_entries".to_string(),
            ));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "pipeline concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Built-in schemas extended with the configured datasets
    pub fn registry(&self) -> Result<SchemaRegistry, ConfigError> {
        let mut registry = SchemaRegistry::builtin();
        for schema in &self.datasets {
            registry.register(schema.clone())?;
        }
        Ok(registry)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            concurrency: self.pipeline.concurrency,
            retention: self.fingerprints.retention(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = SdkConfig::from_toml_str("").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Filesystem);
        assert_eq!(config.pipeline_config(), PipelineConfig::default());
        assert_eq!(config.registry().unwrap().len(), 7);
    }

    #[test]
    fn test_full_config() {
        let config = SdkConfig::from_toml_str(
            r#"
            [store]
            backend = "api"
            base_url = "https://records.example.com/v1"

            [fingerprints]
            max_entries = 50

            [pipeline]
            concurrency = 2

            [[datasets]]
            name = "region"
            collection = "region"
            key_field = "region"
            numeric_fields = [{ name = "2019" }, { name = "2020" }]
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Api);
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.concurrency, 2);
        assert_eq!(pipeline.retention, RetentionPolicy::MaxEntries(50));

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 8);
        assert_eq!(registry.get("region").unwrap().numeric_fields.len(), 2);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            SdkConfig::from_toml_str("[store]\nbackend = \"api\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SdkConfig::from_toml_str("[fingerprints]\nmax_age_days = 1\nmax_entries = 1\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SdkConfig::from_toml_str("[pipeline]\nconcurrency = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SdkConfig::from_toml_str("[store\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = SdkConfig::load_or_default(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, SdkConfig::default());
        assert!(matches!(
            SdkConfig::load(&temp.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
