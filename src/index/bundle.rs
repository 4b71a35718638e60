//! On-disk index bundle: vector index, aligned metadata, manifest, and an
//! optional raw embedding matrix.
//!
//! Every artifact is written to a `.tmp` sibling first and renamed into place
//! only after all of them were written. `index.bin` is swapped last, so a
//! directory holding it always holds the metadata written with it.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::metadata::MetadataStore;
use super::vector::{read_matrix, write_matrix, VectorIndex, EMBEDDINGS_MAGIC};
use crate::error::{IoContext, RagError, Result};

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Build-time facts about a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub dimension: usize,
    pub documents: usize,
    /// Provider id, e.g. `local:all-MiniLM-L6-v2`.
    pub embedder: String,
    pub source: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct IndexBundle {
    index: VectorIndex,
    metadata: MetadataStore,
    manifest: Option<BundleManifest>,
}

impl IndexBundle {
    /// Pair an index with its metadata. Counts must match.
    pub fn new(index: VectorIndex, metadata: MetadataStore) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(RagError::CorruptBundle(format!(
                "{} vectors but {} documents",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self {
            index,
            metadata,
            manifest: None,
        })
    }

    pub fn with_manifest(mut self, manifest: BundleManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn manifest(&self) -> Option<&BundleManifest> {
        self.manifest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Whether `dir` holds the artifacts [`load`](Self::load) requires.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file() && dir.join(METADATA_FILE).is_file()
    }

    /// Write the bundle into `dir`, replacing any previous bundle there.
    ///
    /// `raw_embeddings`, when given, are the pre-normalization vectors in
    /// document order and land in `embeddings.bin`.
    pub fn save(&self, dir: &Path, raw_embeddings: Option<&[Vec<f32>]>) -> Result<()> {
        fs::create_dir_all(dir)
            .io_context(|| format!("failed to create index directory {}", dir.display()))?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        let result = self
            .stage_all(dir, raw_embeddings, &mut staged)
            .and_then(|()| commit(dir, &staged, raw_embeddings.is_none()));
        if let Err(e) = result {
            for (tmp, _) in &staged {
                let _ = fs::remove_file(tmp);
            }
            return Err(e);
        }

        tracing::info!(
            dir = %dir.display(),
            documents = self.len(),
            dimension = self.dimension(),
            "index bundle saved"
        );
        Ok(())
    }

    fn stage_all(
        &self,
        dir: &Path,
        raw_embeddings: Option<&[Vec<f32>]>,
        staged: &mut Vec<(PathBuf, PathBuf)>,
    ) -> Result<()> {
        let metadata_json = self.metadata.to_json()?;
        stage(dir, METADATA_FILE, staged, |mut w| {
            w.write_all(metadata_json.as_bytes())?;
            w.flush()
        })?;

        if let Some(manifest) = &self.manifest {
            let manifest_json = serde_json::to_string_pretty(manifest)?;
            stage(dir, MANIFEST_FILE, staged, |mut w| {
                w.write_all(manifest_json.as_bytes())?;
                w.flush()
            })?;
        }

        if let Some(raw) = raw_embeddings {
            if raw.len() != self.len() {
                return Err(RagError::CorruptBundle(format!(
                    "{} raw embeddings for {} documents",
                    raw.len(),
                    self.len()
                )));
            }
            let flat: Vec<f32> = raw.iter().flatten().copied().collect();
            let dimension = self.dimension();
            stage(dir, EMBEDDINGS_FILE, staged, |w| {
                write_matrix(w, EMBEDDINGS_MAGIC, dimension, &flat)
            })?;
        }

        // Renamed last; see `commit`.
        stage(dir, INDEX_FILE, staged, |w| self.index.write_to(w))?;
        Ok(())
    }

    /// Load the bundle stored in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE);
        let metadata_path = dir.join(METADATA_FILE);
        for path in [&index_path, &metadata_path] {
            if !path.is_file() {
                return Err(RagError::IndexNotFound(path.clone()));
            }
        }

        let file = File::open(&index_path)
            .io_context(|| format!("failed to open {}", index_path.display()))?;
        let index = VectorIndex::read_from(BufReader::new(file))?;

        let json = fs::read_to_string(&metadata_path)
            .io_context(|| format!("failed to read {}", metadata_path.display()))?;
        let metadata = MetadataStore::from_json(&json)?;

        let mut bundle = Self::new(index, metadata)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            let json = fs::read_to_string(&manifest_path)
                .io_context(|| format!("failed to read {}", manifest_path.display()))?;
            bundle.manifest = Some(serde_json::from_str(&json)?);
        }

        tracing::info!(
            dir = %dir.display(),
            documents = bundle.len(),
            dimension = bundle.dimension(),
            "index bundle loaded"
        );
        Ok(bundle)
    }

    /// Read the raw embedding matrix from `dir`, if one was saved.
    pub fn load_raw_embeddings(dir: &Path) -> Result<Option<Vec<Vec<f32>>>> {
        let path = dir.join(EMBEDDINGS_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(&path).io_context(|| format!("failed to open {}", path.display()))?;
        let (dimension, data) = read_matrix(BufReader::new(file), EMBEDDINGS_MAGIC)?;
        if dimension == 0 {
            return Ok(Some(Vec::new()));
        }
        Ok(Some(data.chunks_exact(dimension).map(<[f32]>::to_vec).collect()))
    }
}

/// Move staged artifacts into place.
///
/// The old `index.bin` goes first and the new one arrives last, so a swap
/// interrupted part way leaves a directory that fails to load instead of an
/// index paired with the wrong metadata.
fn commit(dir: &Path, staged: &[(PathBuf, PathBuf)], drop_embeddings: bool) -> Result<()> {
    let mut stale = vec![dir.join(INDEX_FILE)];
    if drop_embeddings {
        stale.push(dir.join(EMBEDDINGS_FILE));
    }
    for path in &stale {
        if path.exists() {
            fs::remove_file(path)
                .io_context(|| format!("failed to remove previous {}", path.display()))?;
        }
    }

    for (tmp, dest) in staged {
        fs::rename(tmp, dest)
            .io_context(|| format!("failed to move {} into place", dest.display()))?;
    }
    Ok(())
}

/// Write one artifact to `<name>.tmp` and record it for the final rename.
fn stage(
    dir: &Path,
    name: &str,
    staged: &mut Vec<(PathBuf, PathBuf)>,
    write: impl FnOnce(BufWriter<File>) -> std::io::Result<()>,
) -> Result<()> {
    let dest = dir.join(name);
    let tmp = dir.join(format!("{name}.tmp"));
    let file =
        File::create(&tmp).io_context(|| format!("failed to create {}", tmp.display()))?;
    staged.push((tmp.clone(), dest));
    write(BufWriter::new(file)).io_context(|| format!("failed to write {}", tmp.display()))
}
