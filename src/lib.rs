//! Emigration Data SDK - Upload and reconciliation library for emigration statistics
//!
//! Provides unified interfaces for:
//! - CSV parsing and dataset validation
//! - Duplicate upload detection (content fingerprints)
//! - Reconciliation of uploads against stored records
//! - Record stores (memory, file system, HTTP API) and fingerprint stores
//! - Dataset record management and chart summaries

pub mod cli;
pub mod config;
pub mod dataset;
pub mod fingerprint;
pub mod import;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod storage;
pub mod summary;
pub mod validation;

// Re-export commonly used types
pub use storage::memory::{MemoryFingerprintStore, MemoryRecordStore};
pub use storage::{FingerprintStore, RecordStore, StorageError};
#[cfg(feature = "native-fs")]
pub use storage::filesystem::{FileFingerprintStore, FileSystemRecordStore};
#[cfg(feature = "api-backend")]
pub use storage::api::ApiRecordStore;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use storage::browser::BrowserFingerprintStore;

pub use config::{ConfigError, SdkConfig};
pub use dataset::{DatasetError, DatasetService};
pub use fingerprint::{FingerprintGuard, FingerprintLedger, RetentionPolicy};
pub use import::{CsvImporter, ImportError, ParsedCsv, RawUploadRow};
pub use pipeline::{
    DuplicateDecision, PipelineConfig, PipelineError, PreparedUpload, UploadPipeline, UploadReport,
};
pub use reconcile::{ReconcileAction, reconcile};
pub use registry::{RegistryError, SchemaRegistry};
pub use validation::{RecordForm, ValidationError, ValidationResult};

// Re-export models
pub use models::{
    DatasetSchema, KeyKind, NormalizedRecord, NumericField, PersistedRecord, SortOrder,
};
