//! Summary command implementation

use serde::Serialize;

use crate::cli::commands::{CliContext, print_json};
use crate::cli::error::CliError;
use crate::cli::output::format_summary;
use crate::dataset::DatasetService;
use crate::summary::{FieldTotal, KeyTotal, field_totals, key_totals, key_totals_for_field};

#[derive(Serialize)]
struct Summary {
    fields: Vec<FieldTotal>,
    keys: Vec<KeyTotal>,
}

/// Handle the summary command
///
/// `field` ranks keys by one numeric field instead of their overall total.
pub async fn handle_summary(
    context: &CliContext,
    dataset: &str,
    top: Option<usize>,
    field: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let schema = context.schema(dataset)?.clone();
    if let Some(field) = field
        && schema.numeric_field(field).is_none()
    {
        return Err(CliError::InvalidArgument(format!(
            "'{}' is not a field of '{}'",
            field, schema.name
        )));
    }

    let service = DatasetService::new(schema, context.records.as_ref());
    let records = service.list().await?;

    let fields = field_totals(service.schema(), &records);
    let mut keys = match field {
        Some(field) => key_totals_for_field(&records, field),
        None => key_totals(&records),
    };
    if let Some(n) = top {
        keys.truncate(n);
    }

    if json {
        return print_json(&Summary { fields, keys });
    }
    print!("{}", format_summary(&fields, &keys));
    Ok(())
}
