//! Record management commands: list, add, update, delete, delete-all

use std::io::IsTerminal;

use crate::cli::commands::upload::confirm;
use crate::cli::commands::{CliContext, parse_assignments, print_json};
use crate::cli::error::CliError;
use crate::cli::output::format_records;
use crate::dataset::DatasetService;
use crate::validation::RecordForm;

fn service<'a>(context: &'a CliContext, dataset: &str) -> Result<DatasetService<'a>, CliError> {
    let schema = context.schema(dataset)?.clone();
    Ok(DatasetService::new(schema, context.records.as_ref()))
}

fn build_form(key: &str, values: &[String]) -> Result<RecordForm, CliError> {
    Ok(parse_assignments(values)?
        .into_iter()
        .fold(RecordForm::new(key), |form, (field, value)| form.set(field, value)))
}

/// Handle the list command
pub async fn handle_list(
    context: &CliContext,
    dataset: &str,
    search: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let service = service(context, dataset)?;
    let records = match search {
        Some(query) => service.search(query).await?,
        None => service.list().await?,
    };

    if json {
        return print_json(&records);
    }
    print!("{}", format_records(service.schema(), &records));
    Ok(())
}

/// Handle the add command
pub async fn handle_add(
    context: &CliContext,
    dataset: &str,
    key: &str,
    values: &[String],
) -> Result<(), CliError> {
    let service = service(context, dataset)?;
    let record = service.add(&build_form(key, values)?).await?;
    println!("✅ Added '{}' ({})", record.key, record.id);
    Ok(())
}

/// Handle the update command
pub async fn handle_update(
    context: &CliContext,
    dataset: &str,
    id: &str,
    key: &str,
    values: &[String],
) -> Result<(), CliError> {
    let service = service(context, dataset)?;
    let record = service.update(id, &build_form(key, values)?).await?;
    println!("✅ Updated '{}' ({})", record.key, record.id);
    Ok(())
}

/// Handle the delete command
pub async fn handle_delete(context: &CliContext, dataset: &str, id: &str) -> Result<(), CliError> {
    service(context, dataset)?.delete(id).await?;
    println!("✅ Deleted {}", id);
    Ok(())
}

/// Handle the delete-all command
///
/// Requires `yes`, or an explicit confirmation on an interactive terminal.
pub async fn handle_delete_all(context: &CliContext, dataset: &str, yes: bool) -> Result<(), CliError> {
    let service = service(context, dataset)?;

    if !yes {
        if !std::io::stdin().is_terminal() {
            return Err(CliError::InvalidArgument(
                "delete-all needs --yes when not run interactively".to_string(),
            ));
        }
        let question = format!("Delete every record in '{}'?", service.schema().name);
        if !confirm(&question)? {
            return Err(CliError::Aborted);
        }
    }

    service.delete_all().await?;
    println!("✅ Deleted all records in '{}'", service.schema().name);
    Ok(())
}
