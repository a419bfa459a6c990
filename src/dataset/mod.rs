//! Dataset record service
//!
//! Manual record management for one dataset: listing in display order,
//! searching by key, and form-validated add, edit and delete.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::models::{DatasetSchema, PersistedRecord, SortOrder, StoredDocument};
use crate::storage::{RecordStore, StorageError};
use crate::validation::{RecordForm, ValidationError, validate_form};

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Errors raised by dataset operations
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DatasetError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            DatasetError::Validation(e) => e.user_message(),
            DatasetError::Storage(StorageError::RecordNotFound { id, .. }) => format!(
                "No record with id '{}'\n\nHint: Run `emigration-cli list` to see record ids.",
                id
            ),
            DatasetError::Storage(e) => e.to_string(),
        }
    }
}

/// Record operations for a single dataset
pub struct DatasetService<'a> {
    schema: DatasetSchema,
    store: &'a dyn RecordStore,
}

impl<'a> DatasetService<'a> {
    pub fn new(schema: DatasetSchema, store: &'a dyn RecordStore) -> Self {
        Self { schema, store }
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// All records, ordered for display
    pub async fn list(&self) -> Result<Vec<PersistedRecord>, DatasetError> {
        let documents = self.store.read_all(&self.schema.collection).await?;
        let mut records = self.decode(&documents);
        sort_records(&mut records, self.schema.sort_order);
        Ok(records)
    }

    /// Records whose key contains `query`, case-insensitively
    pub async fn search(&self, query: &str) -> Result<Vec<PersistedRecord>, DatasetError> {
        let records = self.list().await?;
        Ok(filter_by_key(records, query))
    }

    /// Validate a form and create a record from it
    pub async fn add(&self, form: &RecordForm) -> Result<PersistedRecord, DatasetError> {
        let record = validate_form(&self.schema, form)?;
        let id = self
            .store
            .create(&self.schema.collection, record.to_document(&self.schema))
            .await?;
        info!("Added record {} to {}", id, self.schema.collection);
        Ok(PersistedRecord {
            id,
            key: record.key,
            values: record.values,
        })
    }

    /// Validate a form and overwrite an existing record with it
    pub async fn update(&self, id: &str, form: &RecordForm) -> Result<PersistedRecord, DatasetError> {
        let record = validate_form(&self.schema, form)?;
        self.store
            .update(&self.schema.collection, id, record.to_document(&self.schema))
            .await?;
        info!("Updated record {} in {}", id, self.schema.collection);
        Ok(PersistedRecord {
            id: id.to_string(),
            key: record.key,
            values: record.values,
        })
    }

    pub async fn delete(&self, id: &str) -> Result<(), DatasetError> {
        self.store.delete(&self.schema.collection, id).await?;
        info!("Deleted record {} from {}", id, self.schema.collection);
        Ok(())
    }

    /// Remove every record of the dataset
    pub async fn delete_all(&self) -> Result<(), DatasetError> {
        self.store.delete_all(&self.schema.collection).await?;
        Ok(())
    }

    fn decode(&self, documents: &[StoredDocument]) -> Vec<PersistedRecord> {
        documents
            .iter()
            .map(|doc| PersistedRecord::from_document(&self.schema, doc))
            .collect()
    }
}

/// Keep records whose key contains `query`, ignoring case
///
/// A blank query keeps everything.
pub fn filter_by_key(records: Vec<PersistedRecord>, query: &str) -> Vec<PersistedRecord> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| r.key.to_lowercase().contains(&query))
        .collect()
}

/// Sort records in place; the sort is stable
pub fn sort_records(records: &mut [PersistedRecord], order: SortOrder) {
    match order {
        SortOrder::Insertion => {}
        SortOrder::LeadingNumber => records.sort_by_key(|r| leading_number(&r.key)),
        SortOrder::Numeric => records.sort_by(|a, b| compare_numeric(&a.key, &b.key)),
        SortOrder::Alphabetical => records.sort_by_key(|r| r.key.to_lowercase()),
    }
}

/// First number embedded in a key; keys without one sort last
fn leading_number(key: &str) -> u64 {
    LEADING_NUMBER
        .find(key)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(u64::MAX)
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str) -> PersistedRecord {
        PersistedRecord {
            id: key.to_string(),
            key: key.to_string(),
            values: Default::default(),
        }
    }

    fn keys(records: &[PersistedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_leading_number_order() {
        let mut records = vec![
            record("20 - 24"),
            record("Not Reported"),
            record("14 - Below"),
            record("70 - Above"),
            record("15 - 19"),
        ];
        sort_records(&mut records, SortOrder::LeadingNumber);
        assert_eq!(
            keys(&records),
            vec!["14 - Below", "15 - 19", "20 - 24", "70 - Above", "Not Reported"]
        );
    }

    #[test]
    fn test_numeric_and_alphabetical_order() {
        let mut records = vec![record("2020"), record("1981"), record("1999")];
        sort_records(&mut records, SortOrder::Numeric);
        assert_eq!(keys(&records), vec!["1981", "1999", "2020"]);

        let mut records = vec![record("cebu"), record("Abra"), record("Batangas")];
        sort_records(&mut records, SortOrder::Alphabetical);
        assert_eq!(keys(&records), vec!["Abra", "Batangas", "cebu"]);
    }

    #[test]
    fn test_filter_by_key() {
        let records = vec![record("USA"), record("Australia"), record("Saudi Arabia")];
        let found = filter_by_key(records.clone(), "us");
        assert_eq!(keys(&found), vec!["USA", "Australia"]);
        assert_eq!(filter_by_key(records, "  ").len(), 3);
    }
}
