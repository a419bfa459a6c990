//! Record schema registry
//!
//! Single point of per-dataset variation. The upload pipeline, validator and
//! reconciler are dataset-agnostic; adding a dataset type means adding a
//! [`DatasetSchema`] entry here or in configuration.

use std::collections::HashSet;

use serde::Deserialize;

use crate::models::{DatasetSchema, KeyKind, NumericField, SortOrder, year_fields};

/// Errors raised while building or extending a registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to parse schema definitions: {0}")]
    Parse(String),
    #[error("Invalid schema '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },
}

/// Table of dataset schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<DatasetSchema>,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    datasets: Vec<DatasetSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the seven emigration datasets
    pub fn builtin() -> Self {
        let schemas = vec![
            DatasetSchema::new("age", "age", "ageGroup")
                .with_key_aliases(["Age Group", "age_group"])
                .with_numeric_fields(year_fields(1981, 2020))
                .with_expected_cardinality(14)
                .with_sort_order(SortOrder::LeadingNumber),
            DatasetSchema::new("sex", "sex", "year")
                .with_key_kind(KeyKind::Year)
                .with_numeric_fields(vec![NumericField::new("male"), NumericField::new("female")])
                .with_sort_order(SortOrder::Numeric),
            DatasetSchema::new("civil_status", "civilStatus", "year")
                .with_key_kind(KeyKind::Year)
                .with_numeric_fields(vec![
                    NumericField::new("single"),
                    NumericField::new("married"),
                    NumericField::new("widower"),
                    NumericField::new("separated"),
                    NumericField::new("divorced"),
                    NumericField::new("notReported").with_aliases(["Not Reported"]),
                ])
                .with_sort_order(SortOrder::Numeric),
            DatasetSchema::new("education", "education", "eduAttainment")
                .with_key_aliases(["Educational Attainment", "education"])
                .with_numeric_fields(year_fields(1988, 2020)),
            DatasetSchema::new("occupation", "occupation", "occupation")
                .with_numeric_fields(year_fields(1981, 2020)),
            DatasetSchema::new("origin", "orig", "province")
                .with_numeric_fields(year_fields(1988, 2020))
                .with_sort_order(SortOrder::Alphabetical),
            DatasetSchema::new("destination", "destination", "country")
                .with_numeric_fields(year_fields(1981, 2020))
                .with_sort_order(SortOrder::Alphabetical),
        ];
        Self { schemas }
    }

    /// Parse `[[datasets]]` tables from a TOML document into a new registry
    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        let file: SchemaFile =
            toml::from_str(content).map_err(|e| RegistryError::Parse(e.to_string()))?;
        let mut registry = Self::new();
        for schema in file.datasets {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Add a schema, replacing any existing schema with the same name
    pub fn register(&mut self, schema: DatasetSchema) -> Result<(), RegistryError> {
        validate_schema(&schema)?;
        match self
            .schemas
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(&schema.name))
        {
            Some(existing) => *existing = schema,
            None => self.schemas.push(schema),
        }
        Ok(())
    }

    /// Merge every schema of `other` into this registry
    pub fn extend(&mut self, other: SchemaRegistry) -> Result<(), RegistryError> {
        for schema in other.schemas {
            self.register(schema)?;
        }
        Ok(())
    }

    /// Look up a schema by dataset name or collection name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&DatasetSchema> {
        let name = name.trim();
        self.schemas
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.schemas
                    .iter()
                    .find(|s| s.collection.eq_ignore_ascii_case(name))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetSchema> {
        self.schemas.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn validate_schema(schema: &DatasetSchema) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidSchema {
        name: schema.name.clone(),
        reason: reason.to_string(),
    };

    if schema.name.trim().is_empty() {
        return Err(invalid("dataset name cannot be empty"));
    }
    if schema.collection.trim().is_empty() {
        return Err(invalid("collection name cannot be empty"));
    }
    if schema.key_field.trim().is_empty() {
        return Err(invalid("key field cannot be empty"));
    }
    if schema.numeric_fields.is_empty() {
        return Err(invalid("at least one numeric field is required"));
    }
    if schema.expected_cardinality == Some(0) {
        return Err(invalid("expected cardinality must be positive"));
    }

    let mut seen = HashSet::new();
    for field in &schema.numeric_fields {
        if field.name == schema.key_field {
            return Err(invalid("key field cannot also be a numeric field"));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(RegistryError::InvalidSchema {
                name: schema.name.clone(),
                reason: format!("duplicate numeric field '{}'", field.name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_seven_datasets() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(registry.len(), 7);
        assert_eq!(
            registry.names(),
            vec![
                "age",
                "sex",
                "civil_status",
                "education",
                "occupation",
                "origin",
                "destination"
            ]
        );
    }

    #[test]
    fn test_lookup_by_name_or_collection() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(registry.get("AGE").map(|s| s.key_field.as_str()), Some("ageGroup"));
        assert_eq!(registry.get("orig").map(|s| s.name.as_str()), Some("origin"));
        assert_eq!(
            registry.get("civilStatus").map(|s| s.name.as_str()),
            Some("civil_status")
        );
        assert!(registry.get("weather").is_none());
    }

    #[test]
    fn test_builtin_shapes() {
        let registry = SchemaRegistry::builtin();
        let age = registry.get("age").unwrap();
        assert_eq!(age.numeric_fields.len(), 40);
        assert_eq!(age.expected_cardinality, Some(14));

        let origin = registry.get("origin").unwrap();
        assert_eq!(origin.numeric_fields.len(), 33);
        assert_eq!(origin.expected_cardinality, None);
    }

    #[test]
    fn test_eighth_dataset_from_toml() {
        let toml = r#"
            [[datasets]]
            name = "region"
            collection = "region"
            key_field = "region"
            key_aliases = ["Region Name"]
            sort_order = "alphabetical"
            numeric_fields = [{ name = "2019" }, { name = "2020" }]
        "#;
        let extra = SchemaRegistry::from_toml_str(toml).unwrap();
        let mut registry = SchemaRegistry::builtin();
        registry.extend(extra).unwrap();

        let region = registry.get("region").unwrap();
        assert_eq!(registry.len(), 8);
        assert_eq!(region.numeric_field_names(), vec!["2019", "2020"]);
        assert_eq!(region.sort_order, SortOrder::Alphabetical);
        assert!(region.matches_key_header("REGION NAME"));
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = SchemaRegistry::builtin();
        let replacement = DatasetSchema::new("age", "age_v2", "ageGroup")
            .with_numeric_fields(year_fields(2000, 2001));
        registry.register(replacement).unwrap();
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.get("age").unwrap().collection, "age_v2");
    }

    #[test]
    fn test_invalid_schemas_rejected() {
        let mut registry = SchemaRegistry::new();
        let no_fields = DatasetSchema::new("x", "x", "key");
        assert!(matches!(
            registry.register(no_fields),
            Err(RegistryError::InvalidSchema { .. })
        ));

        let key_is_numeric = DatasetSchema::new("y", "y", "2020")
            .with_numeric_fields(year_fields(2019, 2020));
        assert!(registry.register(key_is_numeric).is_err());

        let duplicate = DatasetSchema::new("z", "z", "key")
            .with_numeric_fields(vec![NumericField::new("a"), NumericField::new("a")]);
        assert!(registry.register(duplicate).is_err());
        assert!(registry.is_empty());
    }
}
