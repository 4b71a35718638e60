//! Vector index, metadata store, and the persisted bundle that pairs them.
//!
//! The only link between a vector and its document is shared position:
//! `index.vector(i)` was embedded from `metadata.get(i)`.

pub mod builder;
pub mod bundle;
pub mod metadata;
pub mod vector;

pub use builder::IndexBuilder;
pub use bundle::{BundleManifest, IndexBundle};
pub use metadata::{MetadataStore, NormalizedDocument};
pub use vector::VectorIndex;
