//! emigration-cli: upload and manage emigration statistics from the command line

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use emigration_data_sdk::cli::CliError;
use emigration_data_sdk::cli::commands::{
    CliContext, records, schemas, summary, upload, validate,
};
use emigration_data_sdk::config::{DEFAULT_CONFIG_NAME, SdkConfig};

#[derive(Parser)]
#[command(name = "emigration-cli", version, about = "Upload and manage emigration statistics")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "EMIGRATION_CONFIG", default_value = DEFAULT_CONFIG_NAME)]
    config: PathBuf,

    /// Bearer token for the API store (overrides the config file)
    #[arg(long, env = "EMIGRATION_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the known datasets
    Schemas {
        #[arg(long)]
        json: bool,
    },
    /// Check a CSV file against a dataset without uploading it
    Validate {
        dataset: String,
        /// CSV file, or "-" for stdin
        input: String,
    },
    /// Upload a CSV file into a dataset
    Upload {
        dataset: String,
        /// CSV file, or "-" for stdin
        input: String,
        /// Merge a file that was uploaded before without asking
        #[arg(long)]
        merge: bool,
        #[arg(long)]
        json: bool,
    },
    /// List the records of a dataset
    List {
        dataset: String,
        /// Only show records whose key contains this text
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Add a record by hand
    Add {
        dataset: String,
        key: String,
        /// Field values as field=value
        #[arg(short = 'v', long = "value")]
        values: Vec<String>,
    },
    /// Replace the key and values of a record
    Update {
        dataset: String,
        id: String,
        key: String,
        /// Field values as field=value
        #[arg(short = 'v', long = "value")]
        values: Vec<String>,
    },
    /// Delete one record
    Delete { dataset: String, id: String },
    /// Delete every record of a dataset
    DeleteAll {
        dataset: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show totals per field and per key
    Summary {
        dataset: String,
        /// Only show the N largest keys
        #[arg(long)]
        top: Option<usize>,
        /// Rank keys by a single field
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

async fn run(cli: Cli, context: CliContext) -> Result<(), CliError> {
    match cli.command {
        Command::Schemas { json } => schemas::handle_schemas(&context, json),
        Command::Validate { dataset, input } => validate::handle_validate(&context, &dataset, &input),
        Command::Upload {
            dataset,
            input,
            merge,
            json,
        } => upload::handle_upload(&context, &dataset, &input, merge, json).await,
        Command::List {
            dataset,
            search,
            json,
        } => records::handle_list(&context, &dataset, search.as_deref(), json).await,
        Command::Add {
            dataset,
            key,
            values,
        } => records::handle_add(&context, &dataset, &key, &values).await,
        Command::Update {
            dataset,
            id,
            key,
            values,
        } => records::handle_update(&context, &dataset, &id, &key, &values).await,
        Command::Delete { dataset, id } => records::handle_delete(&context, &dataset, &id).await,
        Command::DeleteAll { dataset, yes } => {
            records::handle_delete_all(&context, &dataset, yes).await
        }
        Command::Summary {
            dataset,
            top,
            field,
            json,
        } => summary::handle_summary(&context, &dataset, top, field.as_deref(), json).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SdkConfig::load_or_default(&cli.config)
        .with_context(|| format!("load config from {}", cli.config.display()))?;
    if let Some(token) = cli.token.clone() {
        config.store.auth_token = Some(token);
    }

    let context = match CliContext::from_config(config) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, context).await {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}
