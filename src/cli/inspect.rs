//! CLI `inspect` command: print a summary of an index bundle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rowrag::config::RowragConfig;
use rowrag::index::IndexBundle;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Bundle directory (defaults to index.dir from config)
    #[arg(long)]
    pub index_dir: Option<PathBuf>,
}

pub fn inspect(config: &RowragConfig, args: &InspectArgs) -> Result<()> {
    let dir = args
        .index_dir
        .clone()
        .unwrap_or_else(|| config.resolved_index_dir());

    if !IndexBundle::exists(&dir) {
        println!("Index: not found at {}", dir.display());
        println!("Run `rowrag build --csv <file>` to create one.");
        return Ok(());
    }

    let bundle = IndexBundle::load(&dir).context("failed to load index (may be corrupt)")?;
    let raw = IndexBundle::load_raw_embeddings(&dir).context("failed to read embeddings.bin")?;
    let empty_text = bundle
        .metadata()
        .documents()
        .iter()
        .filter(|d| d.text.trim().is_empty())
        .count();

    println!("Index Bundle");
    println!("============");
    println!();
    println!("Directory:         {}", dir.display());
    println!("Documents:         {}", bundle.len());
    println!("Dimension:         {}", bundle.dimension());
    println!("Without text:      {empty_text}");
    println!(
        "Raw embeddings:    {}",
        match &raw {
            Some(rows) => format!("{} rows", rows.len()),
            None => "(not saved)".into(),
        }
    );
    println!();

    match bundle.manifest() {
        Some(manifest) => {
            println!("Source:            {}", manifest.source);
            println!("Built:             {}", manifest.created_at);
            println!("Embedder:");
            println!("  Stored:          {}", manifest.embedder);
            match config.embedding.provider.parse::<rowrag::embedding::EmbedderChoice>() {
                Ok(choice) => {
                    let configured = choice.provider_id(&config.embedding);
                    println!("  Configured:      {configured}");
                    if configured != manifest.embedder {
                        println!("  WARNING: embedder mismatch! Queries will rank rows meaninglessly; rebuild the index or pass --embedder.");
                    } else {
                        println!("  Status:          OK (match)");
                    }
                }
                Err(e) => println!("  Configured:      invalid ({e})"),
            }
        }
        None => println!("Manifest:          (missing)"),
    }

    Ok(())
}
