//! Upload command implementation

use std::io::{BufRead, IsTerminal, Write};

use crate::cli::commands::{CliContext, load_input, print_json};
use crate::cli::error::CliError;
use crate::cli::output::format_upload_report;
use crate::pipeline::{DuplicateDecision, UploadPipeline};

/// Handle the upload command
///
/// A repeated upload is merged when `merge` is set. Otherwise the user is
/// asked on an interactive terminal, and the upload is aborted elsewhere.
pub async fn handle_upload(
    context: &CliContext,
    dataset: &str,
    input: &str,
    merge: bool,
    json: bool,
) -> Result<(), CliError> {
    let content = load_input(input)?;
    let pipeline = UploadPipeline::new(
        context.registry.clone(),
        context.records.as_ref(),
        context.fingerprints.as_ref(),
    )
    .with_config(context.config.pipeline_config());

    let prepared = pipeline.prepare(dataset, &content).await?;

    let decision = if !prepared.is_duplicate() || merge {
        DuplicateDecision::Merge
    } else if input != "-" && std::io::stdin().is_terminal() {
        let question = format!(
            "This file was already uploaded to '{}'. Merge its counts again?",
            prepared.dataset()
        );
        if confirm(&question)? {
            DuplicateDecision::Merge
        } else {
            DuplicateDecision::Abort
        }
    } else {
        DuplicateDecision::Abort
    };

    let report = pipeline.commit(prepared, decision).await?;

    if json {
        return print_json(&report);
    }
    print!("{}", format_upload_report(&report));
    Ok(())
}

/// Ask a yes/no question on the terminal; anything but "y"/"yes" is no
pub fn confirm(question: &str) -> Result<bool, CliError> {
    print!("{} [y/N] ", question);
    std::io::stdout()
        .flush()
        .map_err(|e| CliError::Output(e.to_string()))?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to read answer: {}", e)))?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
