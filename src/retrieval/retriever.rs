use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::context::ContextResolver;
use crate::dataset::DatasetReader;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{IndexBundle, NormalizedDocument};

/// One ranked result of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Position in the vector index (insertion rank).
    pub position: usize,
    /// Cosine similarity to the query.
    pub score: f32,
    pub document: NormalizedDocument,
}

/// Query side of a bundle.
///
/// The provider must embed into the same space the bundle was built with;
/// a mismatched model returns meaningless rankings rather than an error.
pub struct Retriever {
    bundle: IndexBundle,
    provider: Box<dyn EmbeddingProvider>,
    context: ContextResolver,
}

impl Retriever {
    pub fn new(
        bundle: IndexBundle,
        provider: Box<dyn EmbeddingProvider>,
        context: ContextResolver,
    ) -> Self {
        if let Some(manifest) = bundle.manifest() {
            let current = provider.id();
            if manifest.embedder != current {
                tracing::warn!(
                    built_with = %manifest.embedder,
                    querying_with = %current,
                    "embedder differs from the one the index was built with; results may be meaningless"
                );
            }
        }
        Self {
            bundle,
            provider,
            context,
        }
    }

    /// Load the bundle in `dir` with the standard context chain over `reader`.
    pub fn open(
        dir: &Path,
        provider: Box<dyn EmbeddingProvider>,
        reader: Arc<dyn DatasetReader>,
    ) -> Result<Self> {
        let bundle = IndexBundle::load(dir)?;
        Ok(Self::new(bundle, provider, ContextResolver::standard(reader)))
    }

    pub fn bundle(&self) -> &IndexBundle {
        &self.bundle
    }

    /// Embed `text` and return the top `k` documents.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let vector = self.provider.embed(text)?;
        self.search_vector(&vector, k)
    }

    /// Top `k` documents for an already-embedded query.
    pub fn search_vector(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let ranked = self.bundle.index().search(vector, k)?;
        let hits = ranked
            .into_iter()
            .map(|(position, score)| {
                Ok(SearchHit {
                    position,
                    score,
                    document: self.bundle.metadata().get(position)?.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(k, hits = hits.len(), "search complete");
        Ok(hits)
    }

    /// Displayable text for `hit`. Never fails.
    pub fn context(&self, hit: &SearchHit) -> String {
        self.context.resolve(&hit.document)
    }
}
