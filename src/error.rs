//! Error taxonomy for the indexing and retrieval pipelines.
//!
//! Library functions return [`Result`]; the binary wraps these in `anyhow` with
//! additional context. Context reconstruction at query time never produces one
//! of these errors; see [`crate::retrieval::context`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// An embedding or generation backend is not configured or cannot be reached.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A backend answered, but with a failure.
    #[error("provider error: {0}")]
    ProviderError(String),

    /// The generation backend failed to produce an answer.
    #[error("generation failed: {0}")]
    GenerationError(String),

    #[error("index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    /// Vector index and metadata store disagree. Indicates a defect, not bad input.
    #[error("position {position} out of range for metadata store of {len} documents")]
    IndexOutOfRange { position: usize, len: usize },

    /// A batch failed to embed; nothing was written.
    #[error("build aborted at batch {batch}: {reason}")]
    BuildAborted { batch: usize, reason: String },

    #[error("dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corrupt index bundle: {0}")]
    CorruptBundle(String),

    #[error("failed to read dataset {}: {reason}", path.display())]
    Dataset { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

/// Attach a human-readable context string to an I/O error.
pub(crate) trait IoContext<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|source| RagError::Io {
            context: context(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_context_wraps_source() {
        let err: Result<()> = Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
            .io_context(|| "reading index.bin".to_string());
        let msg = err.unwrap_err().to_string();
        assert_eq!(msg, "reading index.bin: gone");
    }

    #[test]
    fn out_of_range_message_names_both_sides() {
        let err = RagError::IndexOutOfRange { position: 7, len: 3 };
        assert!(err.to_string().contains("position 7"));
        assert!(err.to_string().contains("3 documents"));
    }
}
