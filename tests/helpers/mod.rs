#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rowrag::dataset::{DatasetReader, Record};
use rowrag::embedding::EmbeddingProvider;
use rowrag::error::{RagError, Result};
use rowrag::generation::Generator;

/// Deterministic embedder: fixed vectors for known texts, a byte histogram otherwise.
pub struct FakeEmbedder {
    dim: usize,
    fixed: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            fixed: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dim);
        self.fixed.insert(text.to_string(), vector);
        self
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.fixed.get(text) {
            return v.clone();
        }
        let mut v = vec![0.0f32; self.dim];
        for (i, b) in text.bytes().enumerate() {
            v[(i + b as usize) % self.dim] += 1.0;
        }
        v
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn id(&self) -> String {
        format!("fake:d{}", self.dim)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }
}

/// Fails the `fail_on`-th batch (0-based) with a provider error.
pub struct FailingEmbedder {
    inner: FakeEmbedder,
    fail_on: usize,
    batches: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(dim: usize, fail_on: usize) -> Self {
        Self {
            inner: FakeEmbedder::new(dim),
            fail_on,
            batches: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingProvider for FailingEmbedder {
    fn id(&self) -> String {
        "failing".into()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch = self.batches.fetch_add(1, Ordering::SeqCst);
        if batch == self.fail_on {
            return Err(RagError::ProviderError("HTTP 429: rate limited".into()));
        }
        texts.iter().map(|t| self.inner.embed(t)).collect()
    }
}

/// Returns one embedding too few for every batch.
pub struct ShortEmbedder;

impl EmbeddingProvider for ShortEmbedder {
    fn id(&self) -> String {
        "short".into()
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Datasets held in memory, keyed by path. Sources can be removed to
/// simulate a dataset deleted after build.
#[derive(Default)]
pub struct MemoryDataset {
    sources: Mutex<HashMap<PathBuf, Vec<Record>>>,
    pub reads: AtomicUsize,
}

impl MemoryDataset {
    pub fn with_source(path: &str, records: Vec<Record>) -> Self {
        let dataset = Self::default();
        dataset.insert(path, records);
        dataset
    }

    pub fn insert(&self, path: &str, records: Vec<Record>) {
        self.sources
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), records);
    }

    pub fn remove(&self, path: &str) {
        self.sources.lock().unwrap().remove(Path::new(path));
    }
}

impl DatasetReader for MemoryDataset {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.sources
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RagError::Dataset {
                path: path.to_path_buf(),
                reason: "no such dataset".into(),
            })
    }
}

/// Records the prompt it was given and answers with a canned string.
pub struct EchoGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

impl Generator for EchoGenerator {
    fn id(&self) -> String {
        "echo".into()
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(RagError::GenerationError("model overloaded".into()));
        }
        Ok("A is x.".into())
    }
}

/// The three-row survey: `{A: x}`, `{B: y}`, `{}`.
pub fn survey_records() -> Vec<Record> {
    vec![
        Record::new().with("A", "x").with_missing("B"),
        Record::new().with_missing("A").with("B", "y"),
        Record::new().with_missing("A").with_missing("B"),
    ]
}

pub const SURVEY: &str = "memory://survey";

/// Embedder that puts the two survey documents at a known angle.
pub fn survey_embedder() -> FakeEmbedder {
    FakeEmbedder::new(3)
        .with("A: x", vec![1.0, 0.0, 0.0])
        .with("B: y", vec![0.6, 0.8, 0.0])
}
