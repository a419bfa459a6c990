//! Chart series derived from a record set
//!
//! Pure reshaping of [`PersistedRecord`]s into the totals the dataset views
//! plot. Nothing here renders or touches a store.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{DatasetSchema, PersistedRecord, match_key};

/// Total of one numeric field across records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTotal {
    pub field: String,
    pub total: u64,
}

/// Total attributed to one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyTotal {
    pub key: String,
    pub total: u64,
}

/// Sum each numeric field across all records, in schema order
pub fn field_totals(schema: &DatasetSchema, records: &[PersistedRecord]) -> Vec<FieldTotal> {
    schema
        .numeric_fields
        .iter()
        .map(|field| FieldTotal {
            field: field.name.clone(),
            total: records
                .iter()
                .map(|r| r.value(&field.name))
                .fold(0, u64::saturating_add),
        })
        .collect()
}

/// Total of every field per key, largest first
///
/// Records sharing a key are summed together. Ties keep first-seen order.
pub fn key_totals(records: &[PersistedRecord]) -> Vec<KeyTotal> {
    rank(records, PersistedRecord::total)
}

/// Value of a single field per key, largest first
pub fn key_totals_for_field(records: &[PersistedRecord], field: &str) -> Vec<KeyTotal> {
    rank(records, |r| r.value(field))
}

/// The `n` keys with the largest totals
pub fn top_keys(records: &[PersistedRecord], n: usize) -> Vec<KeyTotal> {
    let mut totals = key_totals(records);
    totals.truncate(n);
    totals
}

/// Distinct keys in the order the records are given
pub fn available_keys(records: &[PersistedRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(match_key(&r.key)))
        .map(|r| r.key.clone())
        .collect()
}

fn rank<F>(records: &[PersistedRecord], value: F) -> Vec<KeyTotal>
where
    F: Fn(&PersistedRecord) -> u64,
{
    let mut totals: Vec<KeyTotal> = Vec::new();
    for record in records {
        let key = match_key(&record.key);
        match totals.iter_mut().find(|t| match_key(&t.key) == key) {
            Some(existing) => existing.total = existing.total.saturating_add(value(record)),
            None => totals.push(KeyTotal {
                key: record.key.clone(),
                total: value(record),
            }),
        }
    }
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NumericField;

    fn schema() -> DatasetSchema {
        DatasetSchema::new("origin", "orig", "province")
            .with_numeric_fields(vec![NumericField::new("1988"), NumericField::new("1989")])
    }

    fn record(key: &str, a: u64, b: u64) -> PersistedRecord {
        PersistedRecord {
            id: key.to_string(),
            key: key.to_string(),
            values: [("1988".to_string(), a), ("1989".to_string(), b)].into(),
        }
    }

    #[test]
    fn test_field_totals() {
        let records = [record("Cebu", 1, 2), record("Abra", 10, 20)];
        let totals = field_totals(&schema(), &records);
        assert_eq!(totals[0], FieldTotal { field: "1988".into(), total: 11 });
        assert_eq!(totals[1], FieldTotal { field: "1989".into(), total: 22 });
    }

    #[test]
    fn test_key_totals_descending_and_merged() {
        let records = [record("Cebu", 1, 2), record("Abra", 10, 20), record("cebu ", 100, 0)];
        let totals = key_totals(&records);
        assert_eq!(totals[0].key, "Cebu");
        assert_eq!(totals[0].total, 103);
        assert_eq!(totals[1].total, 30);
    }

    #[test]
    fn test_top_keys_and_field_ranking() {
        let records: Vec<_> = (0..15).map(|i| record(&format!("P{i}"), i, 0)).collect();
        let top = top_keys(&records, 10);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].key, "P14");

        let by_field = key_totals_for_field(&[record("A", 5, 1), record("B", 1, 9)], "1989");
        assert_eq!(by_field[0].key, "B");
    }

    #[test]
    fn test_available_keys_distinct() {
        let records = [record("Cebu", 0, 0), record("CEBU", 0, 0), record("Abra", 0, 0)];
        assert_eq!(available_keys(&records), vec!["Cebu", "Abra"]);
    }

    #[test]
    fn test_totals_saturate() {
        let records = [record("Cebu", u64::MAX, 1), record("cebu", 1, 0)];
        assert_eq!(field_totals(&schema(), &records)[0].total, u64::MAX);
        assert_eq!(key_totals(&records)[0].total, u64::MAX);
        assert_eq!(records[0].total(), u64::MAX);
    }
}
