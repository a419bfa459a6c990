//! In-memory storage backends
//!
//! Hold documents and fingerprints inside the process. Used by tests and by
//! dry-run uploads that should not touch a real store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{FingerprintStore, RecordStore, StorageError, validate_collection_name};
use crate::fingerprint::FingerprintLedger;
use crate::models::{Document, StoredDocument};

/// Record store backed by a map of collections
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    collections: Mutex<BTreeMap<String, Vec<StoredDocument>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<StoredDocument>>>, StorageError> {
        self.collections
            .lock()
            .map_err(|e| StorageError::BackendError(format!("Memory store poisoned: {}", e)))
    }
}

#[async_trait(?Send)]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, collection: &str, document: Document) -> Result<String, StorageError> {
        validate_collection_name(collection)?;
        let id = Uuid::new_v4().to_string();
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields: document,
            });
        Ok(id)
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StorageError> {
        validate_collection_name(collection)?;
        Ok(self.lock()?.get(collection).cloned().unwrap_or_default())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StorageError> {
        validate_collection_name(collection)?;
        let mut collections = self.lock()?;
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StorageError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        document.fields.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        validate_collection_name(collection)?;
        let not_found = || StorageError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let mut collections = self.lock()?;
        let docs = collections.get_mut(collection).ok_or_else(not_found)?;
        let index = docs.iter().position(|d| d.id == id).ok_or_else(not_found)?;
        docs.remove(index);
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<(), StorageError> {
        validate_collection_name(collection)?;
        self.lock()?.remove(collection);
        Ok(())
    }
}

/// Fingerprint store held in memory
#[derive(Debug, Default)]
pub struct MemoryFingerprintStore {
    ledger: Mutex<FingerprintLedger>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing ledger
    pub fn with_ledger(ledger: FingerprintLedger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }
}

#[async_trait(?Send)]
impl FingerprintStore for MemoryFingerprintStore {
    async fn load_seen_digests(&self) -> Result<FingerprintLedger, StorageError> {
        self.ledger
            .lock()
            .map(|l| l.clone())
            .map_err(|e| StorageError::BackendError(format!("Memory store poisoned: {}", e)))
    }

    async fn save_seen_digests(&self, ledger: &FingerprintLedger) -> Result<(), StorageError> {
        let mut current = self
            .ledger
            .lock()
            .map_err(|e| StorageError::BackendError(format!("Memory store poisoned: {}", e)))?;
        *current = ledger.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::runtime::Runtime;

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_crud_cycle() {
        runtime().block_on(async {
            let store = MemoryRecordStore::new();
            let id = store
                .create("sex", doc(json!({ "year": 1981, "male": 1 })))
                .await
                .unwrap();
            assert_eq!(store.len("sex"), 1);

            store
                .update("sex", &id, doc(json!({ "male": 5, "female": 2 })))
                .await
                .unwrap();
            let docs = store.read_all("sex").await.unwrap();
            assert_eq!(docs[0].fields.get("year"), Some(&json!(1981)));
            assert_eq!(docs[0].fields.get("male"), Some(&json!(5)));
            assert_eq!(docs[0].fields.get("female"), Some(&json!(2)));

            store.delete("sex", &id).await.unwrap();
            assert!(store.read_all("sex").await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_missing_record_errors() {
        runtime().block_on(async {
            let store = MemoryRecordStore::new();
            let result = store.update("sex", "nope", Document::new()).await;
            assert!(matches!(result, Err(StorageError::RecordNotFound { .. })));
            let result = store.delete("sex", "nope").await;
            assert!(matches!(result, Err(StorageError::RecordNotFound { .. })));
        });
    }

    #[test]
    fn test_delete_all_scoped_to_collection() {
        runtime().block_on(async {
            let store = MemoryRecordStore::new();
            store.create("age", Document::new()).await.unwrap();
            store.create("age", Document::new()).await.unwrap();
            store.create("orig", Document::new()).await.unwrap();

            store.delete_all("age").await.unwrap();
            assert_eq!(store.len("age"), 0);
            assert_eq!(store.len("orig"), 1);
        });
    }

    #[test]
    fn test_fingerprint_roundtrip() {
        runtime().block_on(async {
            let store = MemoryFingerprintStore::new();
            assert!(store.load_seen_digests().await.unwrap().is_empty());

            let mut ledger = FingerprintLedger::new();
            ledger.insert("age", "abc", chrono::Utc::now());
            store.save_seen_digests(&ledger).await.unwrap();
            assert_eq!(store.load_seen_digests().await.unwrap(), ledger);
        });
    }
}
