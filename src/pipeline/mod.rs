//! Upload pipeline
//!
//! Wires the parser, validator, fingerprint guard and reconciler to the
//! persistence gateways. An upload runs in two steps so the caller can decide
//! what to do about a repeated file:
//!
//! 1. [`UploadPipeline::prepare`] parses, validates and fingerprints the text.
//!    Nothing is written.
//! 2. [`UploadPipeline::commit`] reconciles against the current collection,
//!    applies the plan and records the fingerprint.
//!
//! ```rust
//! use emigration_data_sdk::pipeline::{DuplicateDecision, UploadPipeline};
//! use emigration_data_sdk::registry::SchemaRegistry;
//! use emigration_data_sdk::storage::memory::{MemoryFingerprintStore, MemoryRecordStore};
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # runtime.block_on(async {
//! let records = MemoryRecordStore::new();
//! let fingerprints = MemoryFingerprintStore::new();
//! let pipeline = UploadPipeline::new(SchemaRegistry::builtin(), &records, &fingerprints);
//!
//! let report = pipeline
//!     .ingest("sex", "year,male,female\n1981,10,12\n", |_| DuplicateDecision::Abort)
//!     .await
//!     .unwrap();
//! assert_eq!(report.inserted, 1);
//! # });
//! ```

pub mod error;

pub use error::PipelineError;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fingerprint::{FingerprintGuard, RetentionPolicy};
use crate::import::CsvImporter;
use crate::models::{DatasetSchema, NormalizedRecord, PersistedRecord, values_document};
use crate::reconcile::{PlanSummary, ReconcileAction, reconcile};
use crate::registry::SchemaRegistry;
use crate::storage::{FingerprintStore, RecordStore, StorageError};
use crate::validation::UploadValidator;

/// Default number of store calls dispatched together
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Tuning for the upload pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum store calls in flight at once
    pub concurrency: usize,
    /// Pruning applied to the fingerprint ledger whenever it is loaded
    pub retention: RetentionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retention: RetentionPolicy::Permanent,
        }
    }
}

/// What to do with an upload whose content was seen before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateDecision {
    /// Add the counts to the existing records again
    Merge,
    /// Leave the store untouched
    Abort,
}

/// A validated upload awaiting a commit decision
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    schema: DatasetSchema,
    digest: String,
    is_duplicate: bool,
    records: Vec<NormalizedRecord>,
}

impl PreparedUpload {
    pub fn dataset(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether the same content was already uploaded to this collection
    pub fn is_duplicate(&self) -> bool {
        self.is_duplicate
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn rows_accepted(&self) -> usize {
        self.records.len()
    }
}

/// Outcome of a committed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub dataset: String,
    pub digest: String,
    pub rows_accepted: usize,
    pub inserted: usize,
    pub merged: usize,
    pub was_duplicate: bool,
}

/// Upload pipeline bound to a pair of stores
pub struct UploadPipeline<'a> {
    registry: SchemaRegistry,
    records: &'a dyn RecordStore,
    fingerprints: &'a dyn FingerprintStore,
    importer: CsvImporter,
    guard: FingerprintGuard,
    config: PipelineConfig,
}

impl<'a> UploadPipeline<'a> {
    pub fn new(
        registry: SchemaRegistry,
        records: &'a dyn RecordStore,
        fingerprints: &'a dyn FingerprintStore,
    ) -> Self {
        Self {
            registry,
            records,
            fingerprints,
            importer: CsvImporter::new(),
            guard: FingerprintGuard::new(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_importer(mut self, importer: CsvImporter) -> Self {
        self.importer = importer;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Parse, validate and fingerprint an upload without writing anything
    pub async fn prepare(&self, dataset: &str, raw_text: &str) -> Result<PreparedUpload, PipelineError> {
        let schema = self
            .registry
            .get(dataset)
            .ok_or_else(|| PipelineError::UnknownDataset(dataset.to_string()))?
            .clone();

        let parsed = self.importer.parse(raw_text)?;
        debug!(
            "Parsed {} row(s) with {} column(s) for '{}'",
            parsed.row_count(),
            parsed.headers.len(),
            schema.name
        );

        let records = UploadValidator::new(&schema).validate(&parsed).map_err(|e| {
            warn!("Rejected upload for '{}': {}", schema.name, e);
            e
        })?;

        let mut ledger = self.fingerprints.load_seen_digests().await?;
        let pruned = ledger.apply_retention(self.config.retention, Utc::now());
        if pruned > 0 {
            debug!("Pruned {} expired fingerprint(s)", pruned);
        }

        let check = self.guard.check(&schema.collection, raw_text, &ledger);
        if check.is_duplicate {
            warn!(
                "Upload for '{}' matches a previous upload ({})",
                schema.name, check.digest
            );
        }

        info!(
            "Prepared upload for '{}': {} row(s) accepted",
            schema.name,
            records.len()
        );

        Ok(PreparedUpload {
            schema,
            digest: check.digest,
            is_duplicate: check.is_duplicate,
            records,
        })
    }

    /// Reconcile a prepared upload against the store and apply the plan
    ///
    /// A duplicate upload is only written when the decision is
    /// [`DuplicateDecision::Merge`]. When a store call fails, the records
    /// written before it stay in place and the fingerprint is not recorded.
    pub async fn commit(
        &self,
        prepared: PreparedUpload,
        decision: DuplicateDecision,
    ) -> Result<UploadReport, PipelineError> {
        let PreparedUpload {
            schema,
            digest,
            is_duplicate,
            records,
        } = prepared;

        if is_duplicate && decision == DuplicateDecision::Abort {
            info!("Duplicate upload for '{}' aborted", schema.name);
            return Err(PipelineError::DuplicateUpload { digest });
        }

        let existing: Vec<PersistedRecord> = self
            .records
            .read_all(&schema.collection)
            .await?
            .iter()
            .map(|doc| PersistedRecord::from_document(&schema, doc))
            .collect();

        let plan = reconcile(&schema, &records, &existing);
        let summary = PlanSummary::of(&plan);
        self.apply(&schema, &plan).await?;

        let mut ledger = self.fingerprints.load_seen_digests().await?;
        let now = Utc::now();
        ledger.apply_retention(self.config.retention, now);
        self.guard.record(&schema.collection, &digest, &mut ledger, now);
        self.fingerprints.save_seen_digests(&ledger).await?;

        info!(
            "Committed upload for '{}': {} inserted, {} merged",
            schema.name, summary.inserts, summary.merges
        );

        Ok(UploadReport {
            dataset: schema.name,
            digest,
            rows_accepted: records.len(),
            inserted: summary.inserts,
            merged: summary.merges,
            was_duplicate: is_duplicate,
        })
    }

    /// Prepare and commit in one call
    ///
    /// `decide` is consulted only when the upload is a duplicate.
    pub async fn ingest<F>(
        &self,
        dataset: &str,
        raw_text: &str,
        decide: F,
    ) -> Result<UploadReport, PipelineError>
    where
        F: FnOnce(&PreparedUpload) -> DuplicateDecision,
    {
        let prepared = self.prepare(dataset, raw_text).await?;
        let decision = if prepared.is_duplicate() {
            decide(&prepared)
        } else {
            DuplicateDecision::Merge
        };
        self.commit(prepared, decision).await
    }

    async fn apply(&self, schema: &DatasetSchema, plan: &[ReconcileAction]) -> Result<(), PipelineError> {
        let total = plan.len();
        let mut completed = 0;

        for chunk in plan.chunks(self.config.concurrency.max(1)) {
            let results = join_all(chunk.iter().map(|action| self.apply_action(schema, action))).await;

            let mut failure = None;
            for result in results {
                match result {
                    Ok(()) => completed += 1,
                    Err(e) if failure.is_none() => failure = Some(e),
                    Err(e) => warn!("Additional store failure for '{}': {}", schema.name, e),
                }
            }

            if let Some(cause) = failure {
                warn!(
                    "Store call failed for '{}' after {} of {} record(s): {}",
                    schema.name, completed, total, cause
                );
                return Err(PipelineError::PersistenceFailure {
                    cause,
                    records_completed: completed,
                    records_total: total,
                });
            }
            debug!("Applied {} of {} action(s) for '{}'", completed, total, schema.name);
        }

        Ok(())
    }

    async fn apply_action(&self, schema: &DatasetSchema, action: &ReconcileAction) -> Result<(), StorageError> {
        match action {
            ReconcileAction::Insert { key, values } => {
                let document = NormalizedRecord::new(key.clone(), values.clone()).to_document(schema);
                self.records.create(&schema.collection, document).await?;
            }
            ReconcileAction::Merge { id, values, .. } => {
                self.records
                    .update(&schema.collection, id, values_document(schema, values))
                    .await?;
            }
        }
        Ok(())
    }
}
