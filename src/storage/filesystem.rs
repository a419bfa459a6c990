//! File system storage backend
//!
//! Implements RecordStore and FingerprintStore on the native file system.
//! Each collection is one JSON file (`<collection>.json`) holding an array of
//! documents under a base directory. Used by native apps and the CLI.
//!
//! ## Security
//!
//! All path operations are validated to prevent path traversal attacks.
//! Paths containing ".." are rejected, and all resolved paths are verified
//! to remain within the base directory.

use super::{FingerprintStore, RecordStore, StorageError, validate_collection_name};
use crate::fingerprint::FingerprintLedger;
use crate::models::{Document, StoredDocument};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// File system record store
pub struct FileSystemRecordStore {
    base_path: PathBuf,
    // Serializes read-modify-write cycles on collection files
    write_lock: Mutex<()>,
}

impl FileSystemRecordStore {
    /// Create a new file system record store
    ///
    /// # Arguments
    ///
    /// * `base_path` - Base directory holding one JSON file per collection
    ///
    /// # Example
    ///
    /// ```rust
    /// use emigration_data_sdk::storage::filesystem::FileSystemRecordStore;
    ///
    /// let store = FileSystemRecordStore::new("/var/lib/emigration");
    /// ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, StorageError> {
        validate_collection_name(collection)?;
        resolve_path(&self.base_path, &format!("{}.json", collection))
    }

    async fn load(&self, collection: &str) -> Result<Vec<StoredDocument>, StorageError> {
        let path = self.collection_path(collection)?;
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::SerializationError(format!(
                    "Failed to parse collection {}: {}",
                    collection, e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to read collection {}: {}",
                collection, e
            ))),
        }
    }

    async fn store(&self, collection: &str, docs: &[StoredDocument]) -> Result<(), StorageError> {
        let path = self.collection_path(collection)?;
        let content = serde_json::to_vec_pretty(docs).map_err(|e| {
            StorageError::SerializationError(format!(
                "Failed to serialize collection {}: {}",
                collection, e
            ))
        })?;
        write_file(&path, &content).await
    }
}

#[async_trait(?Send)]
impl RecordStore for FileSystemRecordStore {
    async fn create(&self, collection: &str, document: Document) -> Result<String, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.load(collection).await?;
        let id = Uuid::new_v4().to_string();
        docs.push(StoredDocument {
            id: id.clone(),
            fields: document,
        });
        self.store(collection, &docs).await?;
        debug!("Created document {} in {}", id, collection);
        Ok(id)
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StorageError> {
        self.load(collection).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.load(collection).await?;
        let document = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StorageError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        document.fields.extend(fields);
        self.store(collection, &docs).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.load(collection).await?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(StorageError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.store(collection, &docs).await
    }

    async fn delete_all(&self, collection: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let path = self.collection_path(collection)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted all documents in {}", collection);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to delete collection {}: {}",
                collection, e
            ))),
        }
    }
}

/// Fingerprint ledger stored as a JSON file
pub struct FileFingerprintStore {
    path: PathBuf,
}

impl FileFingerprintStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait(?Send)]
impl FingerprintStore for FileFingerprintStore {
    async fn load_seen_digests(&self) -> Result<FingerprintLedger, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::SerializationError(format!(
                    "Failed to parse fingerprint ledger {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FingerprintLedger::new()),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to read fingerprint ledger {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save_seen_digests(&self, ledger: &FingerprintLedger) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(ledger).map_err(|e| {
            StorageError::SerializationError(format!("Failed to serialize fingerprint ledger: {}", e))
        })?;
        write_file(&self.path, &content).await
    }
}

async fn write_file(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::IoError(format!(
                "Failed to create directory for {}: {}",
                path.display(),
                e
            ))
        })?;
    }

    fs::write(path, content).await.map_err(|e| {
        StorageError::IoError(format!("Failed to write file {}: {}", path.display(), e))
    })
}

/// Resolve a path relative to the base path with security checks.
///
/// # Security
///
/// - Rejects paths containing ".." components
/// - Verifies the resolved path stays within base_path
/// - Handles both existing and non-existing paths safely
fn resolve_path(base_path: &Path, path: &str) -> Result<PathBuf, StorageError> {
    // Normalize: strip leading slashes
    let normalized = path.trim_start_matches('/');

    // Check for path traversal attempts in the input
    if normalized.contains("..") {
        return Err(StorageError::PermissionDenied(
            "Path traversal (..) not allowed".to_string(),
        ));
    }

    let full = base_path.join(normalized);

    for component in full.components() {
        if matches!(component, Component::ParentDir) {
            return Err(StorageError::PermissionDenied(
                "Path traversal not allowed".to_string(),
            ));
        }
    }

    // For existing paths, canonicalize and verify containment
    if full.exists() {
        let canonical = full
            .canonicalize()
            .map_err(|e| StorageError::IoError(format!("Failed to resolve path: {}", e)))?;

        let base_canonical = base_path
            .canonicalize()
            .unwrap_or_else(|_| base_path.to_path_buf());

        if !canonical.starts_with(&base_canonical) {
            return Err(StorageError::PermissionDenied(
                "Path escapes base directory".to_string(),
            ));
        }

        return Ok(canonical);
    }

    // Non-existing files are created by write operations within the validated structure
    Ok(full)
}
