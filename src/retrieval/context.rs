//! Displayable text for a retrieved document.
//!
//! Resolution walks an ordered list of [`ContextSource`]s and takes the first
//! one that produces text. The standard chain is stored text, then a re-read
//! of the original dataset row, then a raw dump of the document fields. The
//! raw dump always succeeds, so resolution never fails.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::dataset::{DatasetReader, Record};
use crate::index::NormalizedDocument;
use crate::normalize::{is_indexable, normalize};

/// One way of turning a document into displayable text.
pub trait ContextSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` hands the document to the next source in the chain.
    fn resolve(&self, doc: &NormalizedDocument) -> Option<String>;
}

/// The text stored in the bundle at build time.
pub struct StoredText;

impl ContextSource for StoredText {
    fn name(&self) -> &'static str {
        "stored"
    }

    fn resolve(&self, doc: &NormalizedDocument) -> Option<String> {
        is_indexable(&doc.text).then(|| doc.text.clone())
    }
}

/// Re-read `source_id` and re-normalize row `row_index`.
///
/// Each source is read at most once; a source that failed to load (moved,
/// deleted, unreadable) is remembered as unavailable.
pub struct DatasetRefetch {
    reader: Arc<dyn DatasetReader>,
    cache: Mutex<HashMap<String, Option<Arc<Vec<Record>>>>>,
}

impl DatasetRefetch {
    pub fn new(reader: Arc<dyn DatasetReader>) -> Self {
        Self {
            reader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn records(&self, source_id: &str) -> Option<Arc<Vec<Record>>> {
        let mut cache = self.cache.lock().ok()?;
        cache
            .entry(source_id.to_string())
            .or_insert_with(|| match self.reader.read(Path::new(source_id)) {
                Ok(records) => Some(Arc::new(records)),
                Err(e) => {
                    tracing::warn!(
                        source = source_id,
                        error = %e,
                        "dataset unavailable for context re-fetch"
                    );
                    None
                }
            })
            .clone()
    }
}

impl ContextSource for DatasetRefetch {
    fn name(&self) -> &'static str {
        "dataset"
    }

    fn resolve(&self, doc: &NormalizedDocument) -> Option<String> {
        if doc.source_id.is_empty() {
            return None;
        }
        let records = self.records(&doc.source_id)?;
        let text = normalize(records.get(doc.row_index)?);
        is_indexable(&text).then_some(text)
    }
}

/// Structural dump of whatever the document carries.
pub struct RawDump;

impl RawDump {
    fn render(doc: &NormalizedDocument) -> String {
        serde_json::to_string(doc).unwrap_or_else(|_| format!("{doc:?}"))
    }
}

impl ContextSource for RawDump {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn resolve(&self, doc: &NormalizedDocument) -> Option<String> {
        Some(Self::render(doc))
    }
}

/// Ordered chain of context sources; first success wins.
pub struct ContextResolver {
    sources: Vec<Box<dyn ContextSource>>,
}

impl ContextResolver {
    pub fn new(sources: Vec<Box<dyn ContextSource>>) -> Self {
        Self { sources }
    }

    /// Stored text → dataset re-fetch through `reader` → raw dump.
    pub fn standard(reader: Arc<dyn DatasetReader>) -> Self {
        Self::new(vec![
            Box::new(StoredText),
            Box::new(DatasetRefetch::new(reader)),
            Box::new(RawDump),
        ])
    }

    pub fn resolve(&self, doc: &NormalizedDocument) -> String {
        for source in &self.sources {
            if let Some(text) = source.resolve(doc) {
                tracing::debug!(source = source.name(), row = doc.row_index, "context resolved");
                return text;
            }
        }
        RawDump::render(doc)
    }
}
