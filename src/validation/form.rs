//! Manual record validation
//!
//! Records typed into a form are held to a stricter standard than uploaded
//! cells: a non-numeric value is an error rather than a zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ValidationError, ValidationResult};
use crate::models::{DatasetSchema, FieldValues, KeyKind, NormalizedRecord};

/// Raw form input for one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordForm {
    pub key: String,
    /// Raw text per canonical numeric field name; absent fields default to 0
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl RecordForm {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: BTreeMap::new(),
        }
    }

    /// Set the raw text of a field
    pub fn set(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }
}

/// Validate a form against a schema
///
/// # Rules
///
/// - The key must not be blank; year keys must be whole numbers
/// - Every field must belong to the schema
/// - Values must be whole non-negative numbers (grouping commas allowed);
///   blank values read as 0
///
/// All problems are reported together.
///
/// # Examples
///
/// ```
/// use emigration_data_sdk::registry::SchemaRegistry;
/// use emigration_data_sdk::validation::{RecordForm, validate_form};
///
/// let registry = SchemaRegistry::builtin();
/// let sex = registry.get("sex").unwrap();
/// let record = validate_form(sex, &RecordForm::new("1981").set("male", "1,200")).unwrap();
/// assert_eq!(record.value("male"), 1200);
/// assert_eq!(record.value("female"), 0);
/// assert!(validate_form(sex, &RecordForm::new("1981").set("male", "many")).is_err());
/// ```
pub fn validate_form(schema: &DatasetSchema, form: &RecordForm) -> ValidationResult<NormalizedRecord> {
    let mut problems = Vec::new();
    let key = form.key.trim();

    if key.is_empty() {
        problems.push(ValidationError::EmptyKey(schema.key_field.clone()));
    } else if schema.key_kind == KeyKind::Year && parse_strict(key).is_none() {
        problems.push(ValidationError::InvalidNumber {
            field: schema.key_field.clone(),
            value: key.to_string(),
        });
    }

    for field in form.values.keys() {
        if schema.numeric_field(field).is_none() {
            problems.push(ValidationError::UnknownField(field.clone()));
        }
    }

    let mut values = FieldValues::new();
    for field in &schema.numeric_fields {
        let raw = form.values.get(&field.name).map(|v| v.trim()).unwrap_or("");
        if raw.is_empty() {
            values.insert(field.name.clone(), 0);
            continue;
        }
        match parse_strict(raw) {
            Some(value) => {
                values.insert(field.name.clone(), value);
            }
            None => problems.push(ValidationError::InvalidNumber {
                field: field.name.clone(),
                value: raw.to_string(),
            }),
        }
    }

    match ValidationError::from_problems(problems) {
        Some(error) => Err(error),
        None => Ok(NormalizedRecord::new(key, values)),
    }
}

fn parse_strict(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;

    #[test]
    fn test_blank_key_rejected() {
        let registry = SchemaRegistry::builtin();
        let age = registry.get("age").unwrap();
        let err = validate_form(age, &RecordForm::new("   ")).unwrap_err();
        assert_eq!(err, ValidationError::EmptyKey("ageGroup".to_string()));
    }

    #[test]
    fn test_all_problems_reported() {
        let registry = SchemaRegistry::builtin();
        let sex = registry.get("sex").unwrap();
        let form = RecordForm::new("nineteen")
            .set("male", "-3")
            .set("female", "12.5")
            .set("other", "1");
        let err = validate_form(sex, &form).unwrap_err();
        assert_eq!(err.problems().len(), 4);
    }

    #[test]
    fn test_text_key_kept_verbatim_after_trim() {
        let registry = SchemaRegistry::builtin();
        let origin = registry.get("origin").unwrap();
        let record = validate_form(origin, &RecordForm::new(" Cebu ").set("2020", "10")).unwrap();
        assert_eq!(record.key, "Cebu");
        assert_eq!(record.value("2020"), 10);
        assert_eq!(record.values.len(), 33);
    }
}
