//! Build path: read rows, normalize them, embed in batches and persist the bundle.
//!
//! [`IndexBuilder::build`] is the single entry point. It embeds the whole
//! dataset before touching the output directory, so an embedding failure in
//! any batch aborts with [`RagError::BuildAborted`] and leaves no artifacts.

use std::path::Path;

use indicatif::ProgressBar;

use super::bundle::{BundleManifest, IndexBundle};
use super::metadata::{MetadataStore, NormalizedDocument};
use super::vector::VectorIndex;
use crate::dataset::{DatasetReader, Record};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::normalize::{is_indexable, normalize};

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Normalize `records` into documents, dropping rows with nothing to index.
///
/// `row_index` keeps the record's position in the dataset, so it still points
/// at the right row after empty rows were skipped.
pub fn documents_from_records(source_id: &str, records: &[Record]) -> Vec<NormalizedDocument> {
    records
        .iter()
        .enumerate()
        .filter_map(|(row, record)| {
            let text = normalize(record);
            is_indexable(&text).then(|| NormalizedDocument {
                row_index: row,
                source_id: source_id.to_string(),
                text,
            })
        })
        .collect()
}

pub struct IndexBuilder<'a> {
    provider: &'a dyn EmbeddingProvider,
    reader: &'a dyn DatasetReader,
    batch_size: usize,
    save_embeddings: bool,
    progress: ProgressBar,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, reader: &'a dyn DatasetReader) -> Self {
        Self {
            provider,
            reader,
            batch_size: DEFAULT_BATCH_SIZE,
            save_embeddings: true,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Also write the raw pre-normalization matrix (`embeddings.bin`).
    pub fn save_embeddings(mut self, save: bool) -> Self {
        self.save_embeddings = save;
        self
    }

    /// Report per-document progress on `progress`. Its length is set by the builder.
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Read and normalize the dataset at `dataset_path`.
    pub fn prepare_documents(&self, dataset_path: &Path) -> Result<Vec<NormalizedDocument>> {
        let records = self.reader.read(dataset_path)?;
        let source_id = dataset_path.to_string_lossy();
        let documents = documents_from_records(&source_id, &records);
        tracing::info!(
            rows = records.len(),
            documents = documents.len(),
            skipped = records.len() - documents.len(),
            "dataset normalized"
        );
        Ok(documents)
    }

    /// Embed `documents` in batches, in order. Fails fast on the first bad batch.
    pub fn embed_documents(&self, documents: &[NormalizedDocument]) -> Result<Vec<Vec<f32>>> {
        self.progress.set_length(documents.len() as u64);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(documents.len());
        let mut dimension: Option<usize> = None;

        for (batch, chunk) in documents.chunks(self.batch_size).enumerate() {
            let aborted = |reason: String| RagError::BuildAborted { batch, reason };

            let texts: Vec<&str> = chunk.iter().map(|d| d.text.as_str()).collect();
            let embeddings = self
                .provider
                .embed_batch(&texts)
                .map_err(|e| aborted(e.to_string()))?;

            if embeddings.len() != chunk.len() {
                return Err(aborted(format!(
                    "provider returned {} embeddings for {} documents",
                    embeddings.len(),
                    chunk.len()
                )));
            }
            for emb in &embeddings {
                let expected = *dimension.get_or_insert(emb.len());
                if emb.len() != expected || expected == 0 {
                    return Err(aborted(format!(
                        "embedding of dimension {} where {expected} was expected",
                        emb.len()
                    )));
                }
            }

            tracing::debug!(batch, size = chunk.len(), "batch embedded");
            vectors.extend(embeddings);
            self.progress.inc(chunk.len() as u64);
        }

        self.progress.finish_and_clear();
        Ok(vectors)
    }

    /// Build the bundle for `dataset_path` and write it to `output_dir`.
    pub fn build(&self, dataset_path: &Path, output_dir: &Path) -> Result<IndexBundle> {
        let documents = self.prepare_documents(dataset_path)?;
        if documents.is_empty() {
            return Err(RagError::Dataset {
                path: dataset_path.to_path_buf(),
                reason: "no rows with any non-missing field".into(),
            });
        }

        let vectors = self.embed_documents(&documents)?;
        let raw = self.save_embeddings.then(|| vectors.clone());

        let index = VectorIndex::build(vectors)?;
        let manifest = BundleManifest {
            dimension: index.dimension(),
            documents: documents.len(),
            embedder: self.provider.id(),
            source: dataset_path.to_string_lossy().into_owned(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let bundle =
            IndexBundle::new(index, MetadataStore::new(documents))?.with_manifest(manifest);

        bundle.save(output_dir, raw.as_deref())?;
        tracing::info!(
            dir = %output_dir.display(),
            documents = bundle.len(),
            embedder = %self.provider.id(),
            "index built"
        );
        Ok(bundle)
    }
}
