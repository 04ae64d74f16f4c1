//! Command-line interface.
//!
//! Every command opens the project database described by the loaded
//! configuration and prints either human-readable text or, with `--json`,
//! a JSON document.

pub mod commands;
pub mod context;
pub mod id_resolver;
pub mod output;

use clap::{Parser, Subcommand};

use crate::domain::models::Config;
use commands::{document::DocumentArgs, entry::EntryArgs, init::InitArgs, task::TaskArgs};

#[derive(Parser, Debug)]
#[command(name = "crowdcheck")]
#[command(about = "Crowdcheck - consensus verification for crowdsourced transcription", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize crowdcheck configuration and database
    Init(InitArgs),

    /// Document management commands
    Document(DocumentArgs),

    /// Task management commands
    Task(TaskArgs),

    /// Entry submission commands
    Entry(EntryArgs),
}

/// Run a parsed command line against `config`.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, cli.json).await,
        Commands::Document(args) => commands::document::execute(args, &config, cli.json).await,
        Commands::Task(args) => commands::task::execute(args, &config, cli.json).await,
        Commands::Entry(args) => commands::entry::execute(args, &config, cli.json).await,
    }
}

/// Print a failed command's error chain and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        let body = serde_json::json!({ "success": false, "error": err.to_string(), "causes": chain });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
