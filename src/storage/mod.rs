//! Storage backend abstraction
//!
//! Defines the persistence gateway traits and their implementations:
//! - MemoryRecordStore / MemoryFingerprintStore: in-process (tests, dry runs)
//! - FileSystemRecordStore / FileFingerprintStore: native file system
//! - ApiRecordStore: remote document store over HTTP (online mode, default)
//! - BrowserFingerprintStore: localStorage (for WASM apps)

use async_trait::async_trait;

use crate::fingerprint::FingerprintLedger;
use crate::models::{Document, StoredDocument};

/// Maximum allowed length for collection names
const MAX_COLLECTION_NAME_LENGTH: usize = 100;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Persistence gateway over a document store
///
/// Documents are flat JSON objects grouped into named collections. The
/// gateway offers no querying; callers read whole collections and filter
/// client-side.
#[async_trait(?Send)]
pub trait RecordStore: Send + Sync {
    /// Create a document and return its new identifier
    async fn create(&self, collection: &str, document: Document) -> Result<String, StorageError>;

    /// Read every document of a collection
    async fn read_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StorageError>;

    /// Merge fields into an existing document
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StorageError>;

    /// Delete one document
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError>;

    /// Delete every document of a collection
    async fn delete_all(&self, collection: &str) -> Result<(), StorageError>;
}

/// Client-local store of previously seen upload digests
#[async_trait(?Send)]
pub trait FingerprintStore: Send + Sync {
    /// Load the ledger; an absent ledger loads as empty
    async fn load_seen_digests(&self) -> Result<FingerprintLedger, StorageError>;

    /// Replace the stored ledger
    async fn save_seen_digests(&self, ledger: &FingerprintLedger) -> Result<(), StorageError>;
}

/// Validate a collection name for safe use in paths and URLs.
///
/// Only alphanumeric characters, hyphens, and underscores are allowed.
pub fn validate_collection_name(collection: &str) -> Result<(), StorageError> {
    if collection.is_empty() {
        return Err(StorageError::BackendError(
            "Collection name cannot be empty".to_string(),
        ));
    }

    if collection.len() > MAX_COLLECTION_NAME_LENGTH {
        return Err(StorageError::BackendError(format!(
            "Collection name too long (max {} characters)",
            MAX_COLLECTION_NAME_LENGTH
        )));
    }

    if !collection
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::BackendError(
            "Collection name contains invalid characters. Only alphanumeric, hyphens, and underscores are allowed.".to_string(),
        ));
    }

    Ok(())
}

pub mod memory;

// Storage backend implementations
#[cfg(feature = "native-fs")]
pub mod filesystem;

#[cfg(feature = "api-backend")]
pub mod api;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod browser;
