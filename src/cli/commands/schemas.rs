//! Schemas command implementation

use crate::cli::commands::{CliContext, print_json};
use crate::cli::error::CliError;
use crate::cli::output::format_schemas;

/// Handle the schemas command
pub fn handle_schemas(context: &CliContext, json: bool) -> Result<(), CliError> {
    if json {
        let schemas: Vec<_> = context.registry.iter().collect();
        return print_json(&schemas);
    }
    print!("{}", format_schemas(&context.registry));
    Ok(())
}
