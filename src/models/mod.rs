//! Models module for the SDK
//!
//! Defines the dataset schema and the record shapes that flow through the
//! upload pipeline.

pub mod record;
pub mod schema;

pub use record::{
    Document, FieldValues, NormalizedRecord, PersistedRecord, StoredDocument, keys_match,
    match_key, parse_count, values_document,
};
pub use schema::{DatasetSchema, KeyKind, NumericField, SortOrder, normalize_header, year_fields};
