use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RowragConfig {
    pub logging: LoggingConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub dir: String,
    pub save_embeddings: bool,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` or `"openai"`.
    pub provider: String,
    /// Local model name; also the subdirectory under `cache_dir`.
    pub model: String,
    pub cache_dir: String,
    pub remote_model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub snippet_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// `"none"` or `"openai"`.
    pub provider: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        let dir = default_rowrag_dir()
            .join("index")
            .to_string_lossy()
            .into_owned();
        Self {
            dir,
            save_embeddings: true,
            batch_size: 32,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_rowrag_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            remote_model: "text-embedding-3-small".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            snippet_chars: 200,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            model: "gpt-4o".into(),
            max_tokens: 400,
            temperature: 0.1,
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
        }
    }
}

impl GenerationConfig {
    /// True when no generation backend is selected (`none` or blank, any case).
    pub fn is_disabled(&self) -> bool {
        let provider = self.provider.trim();
        provider.is_empty() || provider.eq_ignore_ascii_case("none")
    }
}

/// Returns `~/.rowrag/`
pub fn default_rowrag_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rowrag")
}

/// Returns the default config file path: `~/.rowrag/config.toml`
pub fn default_config_path() -> PathBuf {
    default_rowrag_dir().join("config.toml")
}

impl RowragConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RowragConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ROWRAG_INDEX_DIR, ROWRAG_EMBEDDER, ROWRAG_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROWRAG_INDEX_DIR") {
            self.index.dir = val;
        }
        if let Ok(val) = std::env::var("ROWRAG_EMBEDDER") {
            self.embedding.provider = val;
        }
        if let Ok(val) = std::env::var("ROWRAG_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Resolve the index directory, expanding `~` if needed.
    pub fn resolved_index_dir(&self) -> PathBuf {
        expand_tilde(&self.index.dir)
    }
}

/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Resolve an API key: the explicit value wins, then `OPENAI_API_KEY`.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    pick_api_key(explicit, std::env::var(API_KEY_ENV).ok().as_deref())
}

fn pick_api_key(explicit: Option<&str>, from_env: Option<&str>) -> Option<String> {
    let usable = |key: Option<&str>| {
        key.map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    };
    usable(explicit).or_else(|| usable(from_env))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RowragConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(config.retrieval.default_k, 5);
        assert_eq!(config.generation.provider, "none");
        assert!(config.index.dir.ends_with("index"));
        assert!(config.index.save_embeddings);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[logging]
level = "debug"

[index]
dir = "/tmp/rowrag-index"
batch_size = 8

[embedding]
provider = "openai"
api_key = "sk-test"

[retrieval]
default_k = 10
"#;
        let config: RowragConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.index.dir, "/tmp/rowrag-index");
        assert_eq!(config.index.batch_size, 8);
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.retrieval.default_k, 10);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.snippet_chars, 200);
        assert_eq!(config.embedding.remote_model, "text-embedding-3-small");
        assert!(config.index.save_embeddings);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = RowragConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.retrieval.default_k, 5);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = RowragConfig::default();
        std::env::set_var("ROWRAG_INDEX_DIR", "/tmp/override-index");
        std::env::set_var("ROWRAG_EMBEDDER", "openai");
        std::env::set_var("ROWRAG_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.index.dir, "/tmp/override-index");
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.logging.level, "trace");

        // Clean up
        std::env::remove_var("ROWRAG_INDEX_DIR");
        std::env::remove_var("ROWRAG_EMBEDDER");
        std::env::remove_var("ROWRAG_LOG_LEVEL");
    }

    #[test]
    fn explicit_api_key_beats_env() {
        assert_eq!(pick_api_key(Some("sk-a"), Some("sk-b")).as_deref(), Some("sk-a"));
        assert_eq!(pick_api_key(None, Some(" sk-b ")).as_deref(), Some("sk-b"));
        assert_eq!(pick_api_key(None, None), None);
        assert_eq!(pick_api_key(Some("  "), None), None);
        assert_eq!(pick_api_key(Some(""), Some("sk-b")).as_deref(), Some("sk-b"));
    }

    #[test]
    fn generation_disabled_ignores_case_and_blanks() {
        let with = |provider: &str| GenerationConfig {
            provider: provider.into(),
            ..Default::default()
        };
        assert!(GenerationConfig::default().is_disabled());
        assert!(with("").is_disabled());
        assert!(with(" None ").is_disabled());
        assert!(!with("openai").is_disabled());
    }

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand_tilde("~/data/index");
        assert!(expanded.ends_with("data/index"));
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
