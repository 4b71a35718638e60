//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and two implementations: a local
//! ONNX Runtime model ([`local`]) and an OpenAI-compatible HTTP endpoint
//! ([`remote`]). The variant is picked once from configuration via
//! [`create_provider`]; callers only ever see the trait object.

pub mod local;
pub mod remote;

use std::fmt;
use std::str::FromStr;

use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Trait for embedding text into vectors.
///
/// Outputs are returned in input order and share one dimension. All methods
/// are synchronous; callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier recorded in the bundle manifest, e.g. `local:all-MiniLM-L6-v2`.
    fn id(&self) -> String;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderChoice {
    Local,
    OpenAi,
}

impl EmbedderChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
        }
    }

    /// The [`EmbeddingProvider::id`] this choice produces under `config`.
    pub fn provider_id(&self, config: &EmbeddingConfig) -> String {
        match self {
            Self::Local => format!("local:{}", config.model),
            Self::OpenAi => format!("openai:{}", config.remote_model),
        }
    }
}

impl fmt::Display for EmbedderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedderChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" | "remote" => Ok(Self::OpenAi),
            other => Err(format!(
                "unknown embedding provider: {other}. Supported: local, openai"
            )),
        }
    }
}

/// Create an embedding provider for `choice`.
///
/// Fails with [`RagError::ProviderUnavailable`] when the local model files are
/// missing (run `rowrag model download` first) or no API key can be resolved
/// for the remote variant.
pub fn create_provider(
    config: &EmbeddingConfig,
    choice: EmbedderChoice,
) -> Result<Box<dyn EmbeddingProvider>> {
    match choice {
        EmbedderChoice::Local => Ok(Box::new(local::LocalEmbeddingProvider::new(config)?)),
        EmbedderChoice::OpenAi => Ok(Box::new(remote::RemoteEmbeddingProvider::from_config(
            config,
        )?)),
    }
}

/// Create the provider named by `config.provider`.
pub fn create_configured_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let choice = config
        .provider
        .parse::<EmbedderChoice>()
        .map_err(RagError::ProviderUnavailable)?;
    create_provider(config, choice)
}

/// L2-normalize a vector in place. A zero vector is left untouched.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
