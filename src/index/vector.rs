//! Exact inner-product vector index.
//!
//! Vectors are L2-normalized on insertion so inner product equals cosine
//! similarity. Position is insertion rank. Search is a brute-force scan; ties
//! are broken by ascending position so results are fully deterministic.

use std::cmp::Ordering;
use std::io::{Read, Write};

use crate::embedding::l2_normalize_in_place;
use crate::error::{RagError, Result};

/// Magic bytes for the normalized index artifact.
pub(crate) const INDEX_MAGIC: &[u8; 4] = b"RRIX";
/// Magic bytes for the raw embedding matrix artifact.
pub(crate) const EMBEDDINGS_MAGIC: &[u8; 4] = b"RREM";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major, `len * dimension` values.
    data: Vec<f32>,
}

impl VectorIndex {
    /// Build an index from `vectors`, normalizing each one.
    ///
    /// All vectors must share the first vector's dimension. A zero-norm vector
    /// is stored as-is.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = vectors.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for mut v in vectors {
            if v.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: v.len(),
                });
            }
            l2_normalize_in_place(&mut v);
            data.extend_from_slice(&v);
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored (normalized) vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Top-`k` positions by descending cosine similarity to `query`.
    ///
    /// `k` larger than the index returns every position. Equal scores come
    /// back in ascending position order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut q = query.to_vec();
        l2_normalize_in_place(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(pos, v)| (pos, dot(&q, v)))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);
        Ok(scored)
    }

    /// Serialize as the `index.bin` artifact.
    pub fn write_to(&self, writer: impl Write) -> std::io::Result<()> {
        write_matrix(writer, INDEX_MAGIC, self.dimension, &self.data)
    }

    /// Deserialize an `index.bin` artifact.
    pub fn read_from(reader: impl Read) -> Result<Self> {
        let (dimension, data) = read_matrix(reader, INDEX_MAGIC)?;
        Ok(Self { dimension, data })
    }
}

/// Descending score, then ascending position.
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    // `+ 0.0` folds -0.0 into 0.0 so total_cmp treats them as a tie.
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>() + 0.0
}

/// Header (magic, version, dimension, row count) followed by little-endian f32 rows.
pub(crate) fn write_matrix(
    mut writer: impl Write,
    magic: &[u8; 4],
    dimension: usize,
    data: &[f32],
) -> std::io::Result<()> {
    let rows = if dimension == 0 { 0 } else { data.len() / dimension };
    writer.write_all(magic)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(dimension as u32).to_le_bytes())?;
    writer.write_all(&(rows as u64).to_le_bytes())?;
    for value in data {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()
}

pub(crate) fn read_matrix(mut reader: impl Read, magic: &[u8; 4]) -> Result<(usize, Vec<f32>)> {
    let corrupt = |what: &str| RagError::CorruptBundle(what.to_string());

    let mut header = [0u8; 20];
    reader
        .read_exact(&mut header)
        .map_err(|_| corrupt("truncated matrix header"))?;
    if &header[0..4] != magic {
        return Err(corrupt("bad magic bytes"));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(RagError::CorruptBundle(format!(
            "unsupported format version {version}"
        )));
    }
    let dimension = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let mut rows_bytes = [0u8; 8];
    rows_bytes.copy_from_slice(&header[12..20]);
    let rows = u64::from_le_bytes(rows_bytes) as usize;

    let expected_bytes = rows
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("matrix size overflows"))?;
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| RagError::CorruptBundle(format!("reading matrix body: {e}")))?;
    if bytes.len() != expected_bytes {
        return Err(RagError::CorruptBundle(format!(
            "expected {expected_bytes} bytes for {rows}x{dimension} matrix, found {}",
            bytes.len()
        )));
    }

    let data = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok((dimension, data))
}
