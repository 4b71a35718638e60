mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rowrag::config::RowragConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rowrag",
    version,
    about = "Question answering grounded in the rows of a tabular dataset"
)]
struct Cli {
    /// Config file (defaults to ~/.rowrag/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an index bundle from a CSV dataset
    Build(cli::build::BuildArgs),
    /// Retrieve rows for a question and optionally generate an answer
    Query(cli::query::QueryArgs),
    /// Show what an index bundle contains
    Inspect(cli::inspect::InspectArgs),
    /// Manage the local embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the configured embedding model to ~/.rowrag/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RowragConfig::load_from(path)?,
        None => RowragConfig::load()?,
    };

    // Log to stderr so stdout carries only results.
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Index and query work is synchronous; keep it off the async workers.
    match cli.command {
        Command::Build(args) => {
            tokio::task::spawn_blocking(move || cli::build::build(&config, &args)).await??;
        }
        Command::Query(args) => {
            tokio::task::spawn_blocking(move || cli::query::query(&config, &args)).await??;
        }
        Command::Inspect(args) => {
            cli::inspect::inspect(&config, &args)?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
