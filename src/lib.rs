//! Retrieval-augmented question answering over tabular datasets.
//!
//! Each dataset row becomes a short `field: value` document, gets embedded,
//! and is stored in a flat inner-product index next to its provenance. At
//! query time the question is embedded with the same model, the nearest rows
//! are retrieved, and their text grounds a prompt for a generator.
//!
//! # Architecture
//!
//! - **Records**: CSV rows read through the [`dataset::DatasetReader`] seam
//! - **Embeddings**: local ONNX Runtime (all-MiniLM-L6-v2 by default) or an
//!   OpenAI-compatible endpoint, behind [`embedding::EmbeddingProvider`]
//! - **Index**: exact cosine search over L2-normalized vectors; vectors and
//!   metadata are joined by position only
//! - **Bundle**: `index.bin`, `metadata.json`, `manifest.json`, and optionally
//!   `embeddings.bin`, written atomically
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`dataset`]: Records and the CSV reader
//! - [`normalize`]: Record → document text
//! - [`embedding`]: Text-to-vector providers
//! - [`index`]: Vector index, metadata store, bundle persistence, and the builder
//! - [`retrieval`]: Retriever, context fallback chain, and prompt assembly
//! - [`generation`]: Answer generation from a grounding prompt
//! - [`error`]: Error taxonomy

pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod normalize;
pub mod retrieval;

#[cfg(test)]
mod test_support;
