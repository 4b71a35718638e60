//! Per-document provenance, aligned by position with the vector index.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{RagError, Result};

/// Normalized text of one dataset row plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    /// 0-based data row in the source dataset.
    #[serde(rename = "row")]
    pub row_index: usize,
    /// Dataset location as given to the builder.
    #[serde(rename = "source")]
    pub source_id: String,
    /// Empty when the bundle was written without stored text.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Ordered documents; `documents[i]` describes vector `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    documents: Vec<NormalizedDocument>,
}

impl MetadataStore {
    pub fn new(documents: Vec<NormalizedDocument>) -> Self {
        Self { documents }
    }

    /// Document at `position`. Out of range means the bundle is inconsistent.
    pub fn get(&self, position: usize) -> Result<&NormalizedDocument> {
        self.documents
            .get(position)
            .ok_or(RagError::IndexOutOfRange {
                position,
                len: self.documents.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[NormalizedDocument] {
        &self.documents
    }

    /// Pretty JSON array of `{row, source, text}`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.documents)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}
