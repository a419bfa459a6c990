//! Record models
//!
//! [`NormalizedRecord`] is what the validator produces from one CSV row;
//! [`PersistedRecord`] is the typed view of a document owned by the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{DatasetSchema, KeyKind};

/// Flat JSON document as exchanged with a record store
pub type Document = Map<String, Value>;

/// Numeric field values keyed by canonical field name
pub type FieldValues = BTreeMap<String, u64>;

/// A raw document as returned by a record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Opaque identifier assigned by the store
    pub id: String,
    /// Document fields, excluding the identifier
    #[serde(default)]
    pub fields: Document,
}

/// A validated upload row, ready for reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub key: String,
    pub values: FieldValues,
}

impl NormalizedRecord {
    pub fn new(key: impl Into<String>, values: FieldValues) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// Value of a numeric field, 0 when absent
    pub fn value(&self, field: &str) -> u64 {
        self.values.get(field).copied().unwrap_or(0)
    }

    /// Encode as a store document with the schema's key field and every numeric field
    pub fn to_document(&self, schema: &DatasetSchema) -> Document {
        let mut doc = Document::new();
        doc.insert(schema.key_field.clone(), key_value(schema, &self.key));
        doc.extend(values_document(schema, &self.values));
        doc
    }
}

/// Typed view of a persisted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: String,
    pub key: String,
    pub values: FieldValues,
}

impl PersistedRecord {
    /// Decode a store document leniently against a schema
    ///
    /// Missing or malformed numeric fields read as 0; a missing key reads as
    /// an empty string. Fields outside the schema are ignored.
    pub fn from_document(schema: &DatasetSchema, document: &StoredDocument) -> Self {
        let key = document
            .fields
            .get(&schema.key_field)
            .map(value_to_key)
            .unwrap_or_default();

        let values = schema
            .numeric_fields
            .iter()
            .map(|field| {
                let value = document
                    .fields
                    .get(&field.name)
                    .map(value_to_count)
                    .unwrap_or(0);
                (field.name.clone(), value)
            })
            .collect();

        Self {
            id: document.id.clone(),
            key: key.trim().to_string(),
            values,
        }
    }

    /// Value of a numeric field, 0 when absent
    pub fn value(&self, field: &str) -> u64 {
        self.values.get(field).copied().unwrap_or(0)
    }

    /// Sum of all numeric fields, saturating at `u64::MAX`
    pub fn total(&self) -> u64 {
        self.values.values().copied().fold(0, u64::saturating_add)
    }
}

/// Canonical comparison form of a key: trimmed and lower-cased
pub fn match_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Whether two keys identify the same subject
pub fn keys_match(a: &str, b: &str) -> bool {
    match_key(a) == match_key(b)
}

/// Lenient count parse used for uploaded cells
///
/// Grouping commas are stripped, then the leading run of digits is read.
/// Empty, non-numeric, negative or overflowing input yields 0.
///
/// ```rust
/// use emigration_data_sdk::models::parse_count;
///
/// assert_eq!(parse_count("1,234"), 1234);
/// assert_eq!(parse_count("12.7"), 12);
/// assert_eq!(parse_count("abc"), 0);
/// assert_eq!(parse_count(""), 0);
/// ```
pub fn parse_count(raw: &str) -> u64 {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let trimmed = cleaned.trim();
    let unsigned = match trimmed.strip_prefix('-') {
        Some(_) => return 0,
        None => trimmed.strip_prefix('+').unwrap_or(trimmed),
    };
    let digits: String = unsigned.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Encode numeric values as document fields, in schema order
pub fn values_document(schema: &DatasetSchema, values: &FieldValues) -> Document {
    schema
        .numeric_fields
        .iter()
        .map(|field| {
            let value = values.get(&field.name).copied().unwrap_or(0);
            (field.name.clone(), Value::from(value))
        })
        .collect()
}

fn key_value(schema: &DatasetSchema, key: &str) -> Value {
    let key = key.trim();
    match schema.key_kind {
        KeyKind::Year => key
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(key)),
        KeyKind::Text => Value::from(key),
    }
}

fn value_to_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn value_to_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => parse_count(s),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::NumericField;
    use serde_json::json;

    fn sex_schema() -> DatasetSchema {
        DatasetSchema::new("sex", "sex", "year")
            .with_key_kind(KeyKind::Year)
            .with_numeric_fields(vec![NumericField::new("male"), NumericField::new("female")])
    }

    #[test]
    fn test_parse_count_lenient() {
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count(" 12,345,678 "), 12_345_678);
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("+7"), 7);
        assert_eq!(parse_count("42abc"), 42);
        assert_eq!(parse_count("99999999999999999999999"), 0);
    }

    #[test]
    fn test_match_key_trims_and_lowercases() {
        assert_eq!(match_key(" Male "), "male");
        assert!(keys_match(" Male ", "male"));
        assert!(!keys_match("male", "female"));
    }

    #[test]
    fn test_year_key_encoded_as_number() {
        let mut values = FieldValues::new();
        values.insert("male".to_string(), 10);
        let record = NormalizedRecord::new("1981", values);

        let doc = record.to_document(&sex_schema());
        assert_eq!(doc.get("year"), Some(&json!(1981)));
        assert_eq!(doc.get("male"), Some(&json!(10)));
        assert_eq!(doc.get("female"), Some(&json!(0)));
    }

    #[test]
    fn test_from_document_is_lenient() {
        let fields = json!({ "year": 1990, "male": "1,500", "female": 3.0, "extra": "x" });
        let stored = StoredDocument {
            id: "doc-1".to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        };

        let record = PersistedRecord::from_document(&sex_schema(), &stored);
        assert_eq!(record.id, "doc-1");
        assert_eq!(record.key, "1990");
        assert_eq!(record.value("male"), 1500);
        assert_eq!(record.value("female"), 3);
        assert_eq!(record.values.len(), 2);
        assert_eq!(record.total(), 1503);
    }
}
