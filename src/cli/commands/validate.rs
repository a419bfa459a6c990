//! Validate command implementation

use crate::cli::commands::{CliContext, load_input};
use crate::cli::error::CliError;
use crate::cli::output::format_validation;
use crate::import::CsvImporter;
use crate::validation::UploadValidator;

/// Handle the validate command
///
/// Runs the parser and validator only; nothing is written.
pub fn handle_validate(context: &CliContext, dataset: &str, input: &str) -> Result<(), CliError> {
    let schema = context.schema(dataset)?;
    let content = load_input(input)?;

    let parsed = CsvImporter::new().parse(&content)?;
    let records = UploadValidator::new(schema).validate(&parsed)?;

    print!("{}", format_validation(schema, &records));
    Ok(())
}
