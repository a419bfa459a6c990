//! Reconciliation of an upload batch against persisted records
//!
//! Produces a plan of [`ReconcileAction`]s; nothing here touches a store.
//! Incoming counts are added onto existing counts for the same key.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::models::{DatasetSchema, FieldValues, NormalizedRecord, PersistedRecord, match_key};

/// A planned store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReconcileAction {
    /// Create a record for a key the store does not hold yet
    Insert { key: String, values: FieldValues },
    /// Overwrite the numeric fields of an existing record with merged totals
    Merge {
        id: String,
        key: String,
        values: FieldValues,
    },
}

impl ReconcileAction {
    pub fn key(&self) -> &str {
        match self {
            ReconcileAction::Insert { key, .. } | ReconcileAction::Merge { key, .. } => key,
        }
    }

    pub fn values(&self) -> &FieldValues {
        match self {
            ReconcileAction::Insert { values, .. } | ReconcileAction::Merge { values, .. } => values,
        }
    }

    fn values_mut(&mut self) -> &mut FieldValues {
        match self {
            ReconcileAction::Insert { values, .. } | ReconcileAction::Merge { values, .. } => values,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, ReconcileAction::Insert { .. })
    }
}

/// Counts of planned actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub inserts: usize,
    pub merges: usize,
}

impl PlanSummary {
    pub fn of(plan: &[ReconcileAction]) -> Self {
        let inserts = plan.iter().filter(|a| a.is_insert()).count();
        Self {
            inserts,
            merges: plan.len() - inserts,
        }
    }
}

/// Plan the store mutations for a normalized batch
///
/// Keys are compared trimmed and case-insensitively; when several persisted
/// records share a key the first one wins. Rows repeating a key within the
/// batch fold into the action already planned for that key, so the plan holds
/// at most one action per key, in order of first appearance. Sums saturate
/// at `u64::MAX`.
pub fn reconcile(
    schema: &DatasetSchema,
    normalized: &[NormalizedRecord],
    existing: &[PersistedRecord],
) -> Vec<ReconcileAction> {
    let mut existing_by_key: HashMap<String, &PersistedRecord> = HashMap::new();
    for record in existing {
        existing_by_key.entry(match_key(&record.key)).or_insert(record);
    }

    let mut plan: Vec<ReconcileAction> = Vec::new();
    let mut planned: HashMap<String, usize> = HashMap::new();

    for incoming in normalized {
        let key = match_key(&incoming.key);

        if let Some(&index) = planned.get(&key) {
            let values = plan[index].values_mut();
            for field in &schema.numeric_fields {
                let total = values.entry(field.name.clone()).or_insert(0);
                *total = total.saturating_add(incoming.value(&field.name));
            }
            continue;
        }

        let action = match existing_by_key.get(&key) {
            Some(current) => ReconcileAction::Merge {
                id: current.id.clone(),
                key: current.key.clone(),
                values: schema
                    .numeric_fields
                    .iter()
                    .map(|f| {
                        let merged = current.value(&f.name).saturating_add(incoming.value(&f.name));
                        (f.name.clone(), merged)
                    })
                    .collect(),
            },
            None => ReconcileAction::Insert {
                key: incoming.key.trim().to_string(),
                values: schema
                    .numeric_fields
                    .iter()
                    .map(|f| (f.name.clone(), incoming.value(&f.name)))
                    .collect(),
            },
        };
        planned.insert(key, plan.len());
        plan.push(action);
    }

    let summary = PlanSummary::of(&plan);
    debug!(
        "Reconciled {} row(s) for '{}': {} insert(s), {} merge(s)",
        normalized.len(),
        schema.name,
        summary.inserts,
        summary.merges
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NumericField;

    fn schema() -> DatasetSchema {
        DatasetSchema::new("sex", "sex", "category")
            .with_numeric_fields(vec![NumericField::new("a"), NumericField::new("b")])
    }

    fn incoming(key: &str, a: u64, b: u64) -> NormalizedRecord {
        NormalizedRecord::new(key, [("a".to_string(), a), ("b".to_string(), b)].into())
    }

    fn persisted(id: &str, key: &str, a: u64, b: u64) -> PersistedRecord {
        PersistedRecord {
            id: id.to_string(),
            key: key.to_string(),
            values: [("a".to_string(), a), ("b".to_string(), b)].into(),
        }
    }

    #[test]
    fn test_insert_when_no_match() {
        let plan = reconcile(&schema(), &[incoming("x", 1, 2)], &[]);
        assert_eq!(
            plan,
            vec![ReconcileAction::Insert {
                key: "x".into(),
                values: [("a".to_string(), 1), ("b".to_string(), 2)].into(),
            }]
        );
    }

    #[test]
    fn test_merge_is_additive_and_keeps_existing_key() {
        let plan = reconcile(&schema(), &[incoming(" Male ", 5, 0)], &[persisted("id1", "male", 10, 3)]);
        assert_eq!(
            plan,
            vec![ReconcileAction::Merge {
                id: "id1".into(),
                key: "male".into(),
                values: [("a".to_string(), 15), ("b".to_string(), 3)].into(),
            }]
        );
    }

    #[test]
    fn test_intra_batch_accumulates_on_insert() {
        let plan = reconcile(&schema(), &[incoming("15-19", 100, 1), incoming("15-19", 50, 1)], &[]);
        assert_eq!(plan.len(), 1);
        assert!(plan[0].is_insert());
        assert_eq!(plan[0].values()["a"], 150);
        assert_eq!(plan[0].values()["b"], 2);
    }

    #[test]
    fn test_intra_batch_accumulates_on_merge() {
        let existing = [persisted("id1", "x", 1, 1)];
        let plan = reconcile(&schema(), &[incoming("x", 10, 0), incoming("X", 100, 0)], &existing);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].values()["a"], 111);
    }

    #[test]
    fn test_first_existing_match_wins_and_order_preserved() {
        let existing = [persisted("first", "k", 1, 0), persisted("second", "K", 50, 0)];
        let plan = reconcile(&schema(), &[incoming("new", 1, 1), incoming("k", 1, 0)], &existing);
        assert_eq!(plan[0].key(), "new");
        match &plan[1] {
            ReconcileAction::Merge { id, values, .. } => {
                assert_eq!(id, "first");
                assert_eq!(values["a"], 2);
            }
            other => panic!("expected merge, got {other:?}"),
        }
        assert_eq!(PlanSummary::of(&plan), PlanSummary { inserts: 1, merges: 1 });
    }

    #[test]
    fn test_sums_saturate_instead_of_overflowing() {
        let plan = reconcile(&schema(), &[incoming("1990", u64::MAX, 0), incoming("1990", 1, 0)], &[]);
        assert_eq!(plan[0].values()["a"], u64::MAX);

        let existing = [persisted("id1", "1990", u64::MAX - 1, 0)];
        let plan = reconcile(&schema(), &[incoming("1990", 5, 0)], &existing);
        assert_eq!(plan[0].values()["a"], u64::MAX);
    }
}
