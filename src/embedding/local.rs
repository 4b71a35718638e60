//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] for sentence-transformers models exported to
//! ONNX (all-MiniLM-L6-v2 by default) via `ort`. Handles tokenization,
//! inference, mean pooling, and L2 normalization. The ONNX session is loaded on
//! first use and reused for the lifetime of the provider.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{l2_normalize_in_place, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Maximum sequence length for MiniLM-family models (trained at 256).
const MAX_SEQ_LEN: usize = 256;

/// Directory holding `model.onnx` and `tokenizer.json` for `model`.
pub fn model_dir(config: &EmbeddingConfig) -> PathBuf {
    crate::config::expand_tilde(&config.cache_dir).join(&config.model)
}

/// Local ONNX-based embedding provider.
pub struct LocalEmbeddingProvider {
    model: String,
    model_path: PathBuf,
    session: Mutex<Option<Session>>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dir = model_dir(config);
        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                return Err(RagError::ProviderUnavailable(format!(
                    "{} not found. Run `rowrag model download` first.",
                    path.display()
                )));
            }
        }

        let tokenizer = load_tokenizer(&tokenizer_path)?;
        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            model: config.model.clone(),
            model_path,
            session: Mutex::new(None),
            tokenizer,
        })
    }

    fn load_session(&self) -> Result<Session> {
        let unavailable = |e: String| {
            RagError::ProviderUnavailable(format!(
                "failed to load ONNX model {}: {e}",
                self.model_path.display()
            ))
        };
        let session = Session::builder()
            .map_err(|e| unavailable(e.to_string()))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| unavailable(e.to_string()))?
            .with_intra_threads(4)
            .map_err(|e| unavailable(e.to_string()))?
            .commit_from_file(&self.model_path)
            .map_err(|e| unavailable(e.to_string()))?;

        tracing::info!(model = %self.model_path.display(), "ONNX model loaded");
        Ok(session)
    }
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    let unavailable = |e: String| RagError::ProviderUnavailable(format!("tokenizer: {e}"));

    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| unavailable(e.to_string()))?;

    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_SEQ_LEN,
            ..Default::default()
        }))
        .map_err(|e| unavailable(e.to_string()))?;

    tokenizer.with_padding(Some(tokenizers::PaddingParams {
        strategy: tokenizers::PaddingStrategy::BatchLongest,
        ..Default::default()
    }));

    Ok(tokenizer)
}

fn inference_err(e: impl std::fmt::Display) -> RagError {
    RagError::ProviderError(format!("local inference: {e}"))
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn id(&self) -> String {
        format!("local:{}", self.model)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| inference_err("model returned no embedding"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Step 1: Tokenize
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| inference_err(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        // Step 2: Build flat input tensors as i64
        let mut input_ids_flat = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask_flat = Vec::with_capacity(batch_size * seq_len);

        for encoding in &encodings {
            input_ids_flat.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask_flat.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor =
            Tensor::from_array((shape.clone(), input_ids_flat.into_boxed_slice()))
                .map_err(inference_err)?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask_flat.clone().into_boxed_slice()))
                .map_err(inference_err)?;
        // token_type_ids: all zeros (single sentence, no segment B)
        let token_type_ids = vec![0i64; batch_size * seq_len];
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice())).map_err(inference_err)?;

        // Step 3: Run ONNX inference, loading the session on first use
        let mut guard = self
            .session
            .lock()
            .map_err(|e| inference_err(format!("session lock poisoned: {e}")))?;
        if guard.is_none() {
            *guard = Some(self.load_session()?);
        }
        let session = guard
            .as_mut()
            .ok_or_else(|| inference_err("session missing after load"))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            })
            .map_err(inference_err)?;

        // Step 4: Extract token embeddings, shape [batch, seq_len, hidden]
        // The output name varies by ONNX export. Try common names, fall back to index 0.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;

        let dims: &[i64] = &shape;
        if dims.len() != 3 {
            return Err(inference_err(format!(
                "unexpected token_embeddings shape: {dims:?}, expected [batch, seq, hidden]"
            )));
        }
        let hidden_dim = dims[2] as usize;
        let actual_seq_len = dims[1] as usize;

        // Step 5: Mean pooling with attention mask
        let mut results = Vec::with_capacity(batch_size);
        for b in 0..batch_size {
            let mut sum = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;

            for s in 0..actual_seq_len {
                let mask = attention_mask_flat[b * seq_len + s] as f32;
                if mask > 0.0 {
                    let offset = (b * actual_seq_len + s) * hidden_dim;
                    for (d, acc) in sum.iter_mut().enumerate() {
                        *acc += data[offset + d] * mask;
                    }
                    count += mask;
                }
            }

            if count > 0.0 {
                for acc in &mut sum {
                    *acc /= count;
                }
            }

            // Step 6: L2 normalize
            l2_normalize_in_place(&mut sum);
            results.push(sum);
        }

        Ok(results)
    }
}
