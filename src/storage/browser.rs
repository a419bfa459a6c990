//! Browser storage backend
//!
//! Implements FingerprintStore on top of localStorage.
//! Used by WASM apps to remember uploaded files across sessions.

use super::{FingerprintStore, StorageError};
use crate::fingerprint::FingerprintLedger;
use async_trait::async_trait;
use web_sys::Storage;

/// Default localStorage key for the fingerprint ledger
pub const DEFAULT_STORAGE_KEY: &str = "uploadedHashes";

/// Fingerprint ledger kept in the browser's localStorage
pub struct BrowserFingerprintStore {
    storage_key: String,
}

impl BrowserFingerprintStore {
    /// Create a new browser fingerprint store
    ///
    /// # Example
    ///
    /// ```rust
    /// use emigration_data_sdk::storage::browser::BrowserFingerprintStore;
    ///
    /// let store = BrowserFingerprintStore::new("uploadedHashes");
    /// ```
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
        }
    }

    /// Get localStorage instance
    fn get_local_storage(&self) -> Result<Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::BackendError("Window not available".to_string()))?;

        window
            .local_storage()
            .map_err(|e| {
                StorageError::BackendError(format!("localStorage not available: {:?}", e))
            })?
            .ok_or_else(|| StorageError::BackendError("localStorage is None".to_string()))
    }
}

impl Default for BrowserFingerprintStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_KEY)
    }
}

#[async_trait(?Send)]
impl FingerprintStore for BrowserFingerprintStore {
    async fn load_seen_digests(&self) -> Result<FingerprintLedger, StorageError> {
        let storage = self.get_local_storage()?;
        let value = storage.get_item(&self.storage_key).map_err(|e| {
            StorageError::BackendError(format!("Failed to read from localStorage: {:?}", e))
        })?;

        match value {
            Some(value) => serde_json::from_str(&value).map_err(|e| {
                StorageError::SerializationError(format!(
                    "Failed to parse fingerprint ledger: {}",
                    e
                ))
            }),
            None => Ok(FingerprintLedger::new()),
        }
    }

    async fn save_seen_digests(&self, ledger: &FingerprintLedger) -> Result<(), StorageError> {
        let value = serde_json::to_string(ledger).map_err(|e| {
            StorageError::SerializationError(format!(
                "Failed to serialize fingerprint ledger: {}",
                e
            ))
        })?;

        let storage = self.get_local_storage()?;
        storage.set_item(&self.storage_key, &value).map_err(|e| {
            StorageError::BackendError(format!("Failed to write to localStorage: {:?}", e))
        })
    }
}
