//! CLI `query` command: one question or an interactive loop over stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use rowrag::config::{GenerationConfig, RowragConfig};
use rowrag::dataset::CsvDataset;
use rowrag::embedding::{self, EmbedderChoice};
use rowrag::generation::{create_generator, Generator};
use rowrag::index::IndexBundle;
use rowrag::retrieval::{answer_question, ContextResolver, Retriever};

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Bundle directory (defaults to index.dir from config)
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Number of rows to retrieve
    #[arg(long)]
    pub k: Option<usize>,

    /// Embedding backend; must match the one used to build the index
    #[arg(long)]
    pub embedder: Option<EmbedderChoice>,

    /// Ask a single question instead of reading questions from stdin
    #[arg(long)]
    pub question: Option<String>,

    /// Generate an answer with the OpenAI chat model even if config says none
    #[arg(long)]
    pub generate: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn query(config: &RowragConfig, args: &QueryArgs) -> Result<()> {
    let index_dir = args
        .index_dir
        .clone()
        .unwrap_or_else(|| config.resolved_index_dir());

    // A missing bundle is reported before any provider is touched.
    let bundle = IndexBundle::load(&index_dir)
        .with_context(|| format!("failed to load index from {}", index_dir.display()))?;

    let choice = super::resolve_choice(args.embedder, config)?;
    let provider = embedding::create_provider(&config.embedding, choice)
        .context("failed to create embedding provider")?;

    let generation = generation_config(config, args.generate);
    let generator = create_generator(&generation).context("failed to create generator")?;

    let retriever = Retriever::new(
        bundle,
        provider,
        ContextResolver::standard(Arc::new(CsvDataset)),
    );
    let session = Session {
        retriever: &retriever,
        generator: generator.as_deref(),
        k: args.k.unwrap_or(config.retrieval.default_k),
        snippet_chars: config.retrieval.snippet_chars,
        json: args.json,
    };

    if let Some(question) = &args.question {
        return session.ask(question);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nYour question (or 'exit'): ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let question = line.trim();
        if question.is_empty() || matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        if let Err(e) = session.ask(question) {
            eprintln!("error: {e:#}");
        }
    }
    Ok(())
}

/// `--generate` switches a disabled generation section over to OpenAI.
fn generation_config(config: &RowragConfig, force: bool) -> GenerationConfig {
    let mut generation = config.generation.clone();
    if force && generation.is_disabled() {
        generation.provider = "openai".into();
    }
    generation
}

struct Session<'a> {
    retriever: &'a Retriever,
    generator: Option<&'a dyn Generator>,
    k: usize,
    snippet_chars: usize,
    json: bool,
}

impl Session<'_> {
    fn ask(&self, question: &str) -> Result<()> {
        let outcome = answer_question(self.retriever, question, self.k, self.generator)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }

        if outcome.hits.is_empty() {
            println!("No results found.");
            return Ok(());
        }

        println!("\nTop results (position, score, source, row):");
        for resolved in &outcome.hits {
            let hit = &resolved.hit;
            println!(
                "{} {:.4} -> {} row: {} snippet: {}",
                hit.position,
                hit.score,
                hit.document.source_id,
                hit.document.row_index,
                super::snippet(&resolved.context, self.snippet_chars)
            );
        }

        match &outcome.answer {
            Some(answer) => println!("\nAnswer:\n{answer}"),
            None => {
                println!("\nRetrieved context:\n");
                for resolved in &outcome.hits {
                    println!("{}\n", resolved.context);
                }
                println!(
                    "Set generation.provider = \"openai\" or pass --generate to turn this context into an answer."
                );
            }
        }
        Ok(())
    }
}
