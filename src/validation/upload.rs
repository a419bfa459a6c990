//! Upload batch validation
//!
//! Checks parsed headers and rows against a [`DatasetSchema`] and produces the
//! normalized batch. Pure; every structural problem found is reported at once.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::{ValidationError, ValidationResult};
use crate::import::{ParsedCsv, RawUploadRow};
use crate::models::{DatasetSchema, FieldValues, NormalizedRecord, match_key, parse_count};

/// Validator bound to one dataset schema
pub struct UploadValidator<'a> {
    schema: &'a DatasetSchema,
}

/// Headers resolved for a schema
#[derive(Debug)]
struct ResolvedColumns<'h> {
    key: Option<&'h str>,
    /// canonical numeric field name -> header present in the upload
    numeric: BTreeMap<&'h str, &'h str>,
    missing: Vec<String>,
}

impl<'a> UploadValidator<'a> {
    /// Create a new validator for a schema
    pub fn new(schema: &'a DatasetSchema) -> Self {
        Self { schema }
    }

    /// Validate a parsed upload
    pub fn validate(&self, parsed: &ParsedCsv) -> ValidationResult<Vec<NormalizedRecord>> {
        validate(self.schema, &parsed.headers, &parsed.rows)
    }
}

/// Validate headers and rows against a schema
///
/// 1. The key column is resolved against the key field and its aliases.
/// 2. Every numeric field is resolved; all absent ones are reported.
/// 3. When the schema fixes a cardinality, distinct non-blank keys are counted.
/// 4. Rows are normalized with the lenient count parse.
/// 5. Rows with a blank key are dropped.
pub fn validate(
    schema: &DatasetSchema,
    headers: &[String],
    rows: &[RawUploadRow],
) -> ValidationResult<Vec<NormalizedRecord>> {
    let columns = resolve_columns(schema, headers);
    let mut problems = Vec::new();

    if columns.key.is_none() {
        let mut accepted = vec![schema.key_field.clone()];
        accepted.extend(schema.key_aliases.iter().cloned());
        problems.push(ValidationError::MissingKeyColumn {
            key_field: schema.key_field.clone(),
            accepted,
        });
    }

    if !columns.missing.is_empty() {
        problems.push(ValidationError::MissingNumericColumns(columns.missing.clone()));
    }

    if let (Some(key_header), Some(expected)) = (columns.key, schema.expected_cardinality) {
        let distinct: HashSet<String> = rows
            .iter()
            .filter_map(|row| row.get(key_header))
            .map(match_key)
            .filter(|k| !k.is_empty())
            .collect();
        if distinct.len() != expected {
            problems.push(ValidationError::CardinalityMismatch {
                expected,
                actual: distinct.len(),
            });
        }
    }

    if let Some(error) = ValidationError::from_problems(problems) {
        debug!("Upload for '{}' rejected: {}", schema.name, error);
        return Err(error);
    }

    // Key column is known to be present past this point.
    let Some(key_header) = columns.key else {
        return Ok(Vec::new());
    };

    let records: Vec<NormalizedRecord> = rows
        .iter()
        .filter_map(|row| {
            let key = row.get(key_header).unwrap_or_default().trim();
            if key.is_empty() {
                return None;
            }
            let values: FieldValues = schema
                .numeric_fields
                .iter()
                .map(|field| {
                    let raw = columns
                        .numeric
                        .get(field.name.as_str())
                        .and_then(|header| row.get(header))
                        .unwrap_or_default();
                    (field.name.clone(), parse_count(raw))
                })
                .collect();
            Some(NormalizedRecord::new(key, values))
        })
        .collect();

    debug!(
        "Validated {} of {} row(s) for '{}'",
        records.len(),
        rows.len(),
        schema.name
    );
    Ok(records)
}

fn resolve_columns<'h>(schema: &'h DatasetSchema, headers: &'h [String]) -> ResolvedColumns<'h> {
    let key = headers
        .iter()
        .find(|h| schema.matches_key_header(h))
        .map(String::as_str);

    let mut numeric = BTreeMap::new();
    let mut missing = Vec::new();
    for field in &schema.numeric_fields {
        // Prefer an exact header over an alias match
        let header = headers
            .iter()
            .find(|h| h.trim() == field.name)
            .or_else(|| headers.iter().find(|h| field.matches_header(h)));
        match header {
            Some(h) => {
                numeric.insert(field.name.as_str(), h.as_str());
            }
            None => missing.push(field.name.clone()),
        }
    }

    ResolvedColumns {
        key,
        numeric,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::CsvImporter;
    use crate::models::{NumericField, year_fields};

    fn small_schema() -> DatasetSchema {
        DatasetSchema::new("age", "age", "ageGroup")
            .with_key_aliases(["Age Group", "age_group"])
            .with_numeric_fields(year_fields(1981, 1983))
            .with_expected_cardinality(2)
    }

    fn parse(csv: &str) -> ParsedCsv {
        CsvImporter::new().parse(csv).unwrap()
    }

    #[test]
    fn test_valid_upload_normalizes() {
        let parsed = parse("AGE GROUP,1981,1982,1983\n15-19,\"1,234\",abc,\n20-24,1,2,3\n");
        let records = UploadValidator::new(&small_schema()).validate(&parsed).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "15-19");
        assert_eq!(records[0].value("1981"), 1234);
        assert_eq!(records[0].value("1982"), 0);
        assert_eq!(records[0].value("1983"), 0);
        assert_eq!(records[1].value("1983"), 3);
    }

    #[test]
    fn test_missing_key_column() {
        let parsed = parse("group,1981,1982,1983\n15-19,1,2,3\n");
        let err = validate(&small_schema(), &parsed.headers, &parsed.rows).unwrap_err();
        assert!(matches!(err, ValidationError::MissingKeyColumn { .. }));
    }

    #[test]
    fn test_missing_columns_and_key_reported_together() {
        let parsed = parse("group,1981\n15-19,1\n");
        let err = validate(&small_schema(), &parsed.headers, &parsed.rows).unwrap_err();
        let problems = err.problems();
        assert_eq!(problems.len(), 2);
        assert!(matches!(problems[0], ValidationError::MissingKeyColumn { .. }));
        assert_eq!(
            problems[1],
            &ValidationError::MissingNumericColumns(vec!["1982".into(), "1983".into()])
        );
    }

    #[test]
    fn test_blank_keys_dropped_and_not_counted() {
        let parsed = parse("ageGroup,1981,1982,1983\n15-19,1,1,1\n  ,9,9,9\n20-24,2,2,2\n");
        let records = validate(&small_schema(), &parsed.headers, &parsed.rows).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.key.is_empty()));
    }

    #[test]
    fn test_cardinality_is_case_insensitive() {
        let parsed = parse("ageGroup,1981,1982,1983\n15-19,1,1,1\nUnder 15,1,1,1\nunder 15 ,1,1,1\n");
        let records = validate(&small_schema(), &parsed.headers, &parsed.rows).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].key, "under 15");
    }

    #[test]
    fn test_alias_numeric_column() {
        let schema = DatasetSchema::new("civil_status", "civilStatus", "year").with_numeric_fields(
            vec![
                NumericField::new("single"),
                NumericField::new("notReported").with_aliases(["Not Reported"]),
            ],
        );
        let parsed = parse("YEAR,Single,Not Reported\n1981,\"2,000\",7\n");
        let records = validate(&schema, &parsed.headers, &parsed.rows).unwrap();
        assert_eq!(records[0].key, "1981");
        assert_eq!(records[0].value("single"), 2000);
        assert_eq!(records[0].value("notReported"), 7);
    }
}
