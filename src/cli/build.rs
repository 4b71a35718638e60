//! CLI `build` command: embed a CSV dataset into an index bundle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::ProgressBar;
use rowrag::config::RowragConfig;
use rowrag::dataset::CsvDataset;
use rowrag::embedding::{self, EmbedderChoice};
use rowrag::index::IndexBuilder;

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// CSV dataset to index (first row is the header)
    #[arg(long)]
    pub csv: PathBuf,

    /// Where to write the bundle (defaults to index.dir from config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Embedding backend: local or openai
    #[arg(long)]
    pub embedder: Option<EmbedderChoice>,

    /// Skip writing the raw embedding matrix
    #[arg(long)]
    pub no_embeddings: bool,
}

pub fn build(config: &RowragConfig, args: &BuildArgs) -> Result<()> {
    let choice = super::resolve_choice(args.embedder, config)?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.resolved_index_dir());

    let provider = embedding::create_provider(&config.embedding, choice)
        .context("failed to create embedding provider")?;

    let pb = ProgressBar::new(0);
    if let Some(style) = super::bar_style("  {bar:40.cyan/blue} {pos}/{len} ({eta})") {
        pb.set_style(style);
    }

    println!(
        "Embedding {} with '{}'...",
        args.csv.display(),
        provider.id()
    );

    let bundle = IndexBuilder::new(provider.as_ref(), &CsvDataset)
        .batch_size(config.index.batch_size)
        .save_embeddings(config.index.save_embeddings && !args.no_embeddings)
        .progress(pb)
        .build(&args.csv, &output_dir)
        .with_context(|| format!("failed to build index from {}", args.csv.display()))?;

    println!(
        "Indexed {} documents ({} dims) into {}",
        bundle.len(),
        bundle.dimension(),
        output_dir.display()
    );
    Ok(())
}
