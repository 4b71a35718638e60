pub mod build;
pub mod inspect;
pub mod query;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rowrag::config::{EmbeddingConfig, RowragConfig};
use rowrag::embedding::EmbedderChoice;
use std::path::Path;
use tokio::io::AsyncWriteExt;

const HF_BASE_URL: &str = "https://huggingface.co/sentence-transformers";

/// Embedder from the command line, else from config.
pub(crate) fn resolve_choice(
    arg: Option<EmbedderChoice>,
    config: &RowragConfig,
) -> Result<EmbedderChoice> {
    match arg {
        Some(choice) => Ok(choice),
        None => config
            .embedding
            .provider
            .parse()
            .map_err(anyhow::Error::msg),
    }
}

/// One-line preview: newlines become `; `, cut to `max_chars` plus `...`.
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', "; ");
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub(crate) fn bar_style(template: &str) -> Option<ProgressStyle> {
    ProgressStyle::default_bar()
        .template(template)
        .ok()
        .map(|style| style.progress_chars("##-"))
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let model_dir = rowrag::embedding::local::model_dir(config);
    std::fs::create_dir_all(&model_dir)
        .with_context(|| format!("failed to create cache dir: {}", model_dir.display()))?;

    let base = format!("{HF_BASE_URL}/{}/resolve/main", config.model);
    let files = [
        ("model.onnx", format!("{base}/onnx/model.onnx")),
        ("tokenizer.json", format!("{base}/tokenizer.json")),
    ];

    for (name, url) in &files {
        let dest = model_dir.join(name);
        if dest.exists() {
            println!("{name} already exists at {}", dest.display());
        } else {
            println!("Downloading {name} for {}...", config.model);
            download_file(url, &dest).await?;
            println!("Saved to {}", dest.display());
        }
    }

    println!("Model download complete. Ready for use.");
    Ok(())
}

/// Download a file from a URL with progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download of {url} failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            if let Some(style) = bar_style("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})") {
                pb.set_style(style);
            }
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
