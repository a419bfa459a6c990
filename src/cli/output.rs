//! Output formatting for CLI

use crate::models::{DatasetSchema, NormalizedRecord, PersistedRecord};
use crate::pipeline::UploadReport;
use crate::registry::SchemaRegistry;
use crate::summary::{FieldTotal, KeyTotal};

/// Format the schema table
pub fn format_schemas(registry: &SchemaRegistry) -> String {
    let mut output = String::new();
    output.push_str(&format!("{} dataset(s):\n", registry.len()));
    for schema in registry.iter() {
        output.push_str(&format!("\n{}\n", schema.name));
        output.push_str(&format!("  Collection: {}\n", schema.collection));
        output.push_str(&format!("  Key: {}", schema.key_field));
        if !schema.key_aliases.is_empty() {
            output.push_str(&format!(" (also: {})", schema.key_aliases.join(", ")));
        }
        output.push('\n');
        output.push_str(&format!("  Fields: {}\n", summarize_fields(schema)));
        if let Some(cardinality) = schema.expected_cardinality {
            output.push_str(&format!("  Distinct keys required: {}\n", cardinality));
        }
    }
    output
}

fn summarize_fields(schema: &DatasetSchema) -> String {
    let names = schema.numeric_field_names();
    match names.as_slice() {
        [] => "(none)".to_string(),
        [first, .., last] if names.len() > 6 => {
            format!("{}..{} ({} columns)", first, last, names.len())
        }
        _ => names.join(", "),
    }
}

/// Format the rows a validation run accepted
pub fn format_validation(schema: &DatasetSchema, records: &[NormalizedRecord]) -> String {
    let mut output = format!(
        "\n✅ {} row(s) valid for '{}':\n",
        records.len(),
        schema.name
    );
    for record in records {
        let total = record.values.values().copied().fold(0, u64::saturating_add);
        output.push_str(&format!("  - {} (total {})\n", record.key, total));
    }
    output
}

/// Format an upload report
pub fn format_upload_report(report: &UploadReport) -> String {
    let mut output = String::new();
    if report.was_duplicate {
        output.push_str("\n⚠️  Content matched a previous upload; counts were merged again.\n");
    }
    output.push_str(&format!(
        "\n✅ Uploaded {} row(s) to '{}'\n",
        report.rows_accepted, report.dataset
    ));
    output.push_str(&format!("  Inserted: {}\n", report.inserted));
    output.push_str(&format!("  Merged: {}\n", report.merged));
    output.push_str(&format!("  Digest: {}\n", report.digest));
    output
}

/// Format records as an id / key / total listing
pub fn format_records(schema: &DatasetSchema, records: &[PersistedRecord]) -> String {
    if records.is_empty() {
        return format!("No records in '{}'\n", schema.name);
    }
    let key_width = records
        .iter()
        .map(|r| r.key.len())
        .chain(std::iter::once(schema.key_field.len()))
        .max()
        .unwrap_or(0);

    let mut output = format!("{:<36}  {:<key_width$}  {}\n", "id", schema.key_field, "total");
    for record in records {
        output.push_str(&format!(
            "{:<36}  {:<key_width$}  {}\n",
            record.id,
            record.key,
            record.total()
        ));
    }
    output.push_str(&format!("\n{} record(s)\n", records.len()));
    output
}

/// Format per-field totals followed by ranked key totals
pub fn format_summary(fields: &[FieldTotal], keys: &[KeyTotal]) -> String {
    let mut output = String::from("Totals by field:\n");
    for total in fields {
        output.push_str(&format!("  {:<16} {}\n", total.field, total.total));
    }
    output.push_str("\nTotals by key:\n");
    for (rank, total) in keys.iter().enumerate() {
        output.push_str(&format!("  {:>3}. {} ({})\n", rank + 1, total.key, total.total));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_field_lists_are_abbreviated() {
        let registry = SchemaRegistry::builtin();
        let output = format_schemas(&registry);
        assert!(output.contains("1981..2020 (40 columns)"));
        assert!(output.contains("male, female"));
        assert!(output.contains("Distinct keys required: 14"));
    }

    #[test]
    fn test_upload_report_mentions_duplicates() {
        let report = UploadReport {
            dataset: "sex".into(),
            digest: "abc".into(),
            rows_accepted: 2,
            inserted: 1,
            merged: 1,
            was_duplicate: true,
        };
        let output = format_upload_report(&report);
        assert!(output.contains("previous upload"));
        assert!(output.contains("Inserted: 1"));
    }
}
