//! Dataset schema model
//!
//! A [`DatasetSchema`] describes the expected shape of one dataset type: which
//! column identifies a record, which columns hold counts, and how many distinct
//! keys a complete upload must contain.

use serde::{Deserialize, Serialize};

/// How the key column of a dataset is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Free-text category (age group, province, country, ...)
    #[default]
    Text,
    /// Calendar year; persisted as a JSON number
    Year,
}

/// Display ordering for records of a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Keep the order the store returned
    #[default]
    Insertion,
    /// Order by the first number embedded in the key ("15-19" before "20-24")
    LeadingNumber,
    /// Order by the key parsed as a number
    Numeric,
    /// Case-insensitive alphabetical order
    Alphabetical,
}

/// A column expected to hold a non-negative integer count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericField {
    /// Canonical field name used in persisted documents
    pub name: String,
    /// Additional accepted header spellings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl NumericField {
    /// Create a numeric field without aliases
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    /// Add accepted header spellings
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Whether a raw CSV header refers to this field
    ///
    /// Matches the canonical name exactly (which covers year columns such as
    /// `"1981"`), or any alias after header normalization.
    pub fn matches_header(&self, header: &str) -> bool {
        let trimmed = header.trim();
        if trimmed == self.name {
            return true;
        }
        let normalized = normalize_header(trimmed);
        normalize_header(&self.name) == normalized
            || self.aliases.iter().any(|a| normalize_header(a) == normalized)
    }
}

/// Declarative description of one dataset type
///
/// # Example
///
/// ```rust
/// use emigration_data_sdk::models::{DatasetSchema, KeyKind, NumericField};
///
/// let schema = DatasetSchema::new("sex", "sex", "year")
///     .with_key_kind(KeyKind::Year)
///     .with_numeric_fields(vec![NumericField::new("male"), NumericField::new("female")]);
/// assert_eq!(schema.numeric_field_names(), vec!["male", "female"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Dataset identifier (e.g. "age", "civil_status")
    pub name: String,
    /// Remote collection holding this dataset's records
    pub collection: String,
    /// Canonical name of the identifying column
    pub key_field: String,
    /// Accepted header spellings for the identifying column
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_aliases: Vec<String>,
    #[serde(default)]
    pub key_kind: KeyKind,
    /// Ordered count columns
    #[serde(default)]
    pub numeric_fields: Vec<NumericField>,
    /// Exact number of distinct keys a valid upload must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_cardinality: Option<usize>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl DatasetSchema {
    /// Create a schema with no numeric fields and no cardinality constraint
    pub fn new(
        name: impl Into<String>,
        collection: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            key_field: key_field.into(),
            key_aliases: Vec::new(),
            key_kind: KeyKind::Text,
            numeric_fields: Vec::new(),
            expected_cardinality: None,
            sort_order: SortOrder::Insertion,
        }
    }

    pub fn with_key_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_key_kind(mut self, kind: KeyKind) -> Self {
        self.key_kind = kind;
        self
    }

    pub fn with_numeric_fields(mut self, fields: Vec<NumericField>) -> Self {
        self.numeric_fields = fields;
        self
    }

    pub fn with_expected_cardinality(mut self, cardinality: usize) -> Self {
        self.expected_cardinality = Some(cardinality);
        self
    }

    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    /// Canonical numeric field names in schema order
    pub fn numeric_field_names(&self) -> Vec<&str> {
        self.numeric_fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Look up a numeric field by canonical name
    pub fn numeric_field(&self, name: &str) -> Option<&NumericField> {
        self.numeric_fields.iter().find(|f| f.name == name)
    }

    /// Whether a raw CSV header refers to the key column
    pub fn matches_key_header(&self, header: &str) -> bool {
        let normalized = normalize_header(header);
        normalize_header(&self.key_field) == normalized
            || self
                .key_aliases
                .iter()
                .any(|a| normalize_header(a) == normalized)
    }
}

/// One numeric field per year in `start..=end`
pub fn year_fields(start: u16, end: u16) -> Vec<NumericField> {
    (start..=end)
        .map(|year| NumericField::new(year.to_string()))
        .collect()
}

/// Normalize a header for case- and spacing-insensitive comparison
///
/// Lower-cases and drops whitespace, underscores and hyphens, so that
/// `"Age Group"`, `"AGE_GROUP"` and `"ageGroup"` all compare equal.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header_variants() {
        assert_eq!(normalize_header("Age Group"), "agegroup");
        assert_eq!(normalize_header("AGE_GROUP"), "agegroup");
        assert_eq!(normalize_header(" ageGroup "), "agegroup");
        assert_eq!(normalize_header("Not-Reported"), "notreported");
    }

    #[test]
    fn test_numeric_field_matches_year_and_alias() {
        let year = NumericField::new("1981");
        assert!(year.matches_header("1981"));
        assert!(year.matches_header(" 1981 "));
        assert!(!year.matches_header("1982"));

        let not_reported = NumericField::new("notReported").with_aliases(["Not Reported"]);
        assert!(not_reported.matches_header("NOT REPORTED"));
        assert!(not_reported.matches_header("not_reported"));
        assert!(!not_reported.matches_header("reported"));
    }

    #[test]
    fn test_key_header_matching() {
        let schema = DatasetSchema::new("age", "age", "ageGroup").with_key_aliases(["Age Group"]);
        assert!(schema.matches_key_header("AGE GROUP"));
        assert!(schema.matches_key_header("age_group"));
        assert!(!schema.matches_key_header("age"));
    }

    #[test]
    fn test_year_fields_inclusive() {
        let fields = year_fields(1981, 2020);
        assert_eq!(fields.len(), 40);
        assert_eq!(fields[0].name, "1981");
        assert_eq!(fields[39].name, "2020");
    }
}
