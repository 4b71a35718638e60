//! OpenAI-compatible remote embedding provider.
//!
//! Issues one `/embeddings` request per text so outputs line up with inputs by
//! construction. Transient failures (429, 5xx, connection errors) are retried
//! with exponential backoff up to `max_retries` times.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::{resolve_api_key, EmbeddingConfig, API_KEY_ENV};
use crate::error::{RagError, Result};

/// Blocking embeddings client for OpenAI-compatible endpoints.
pub struct RemoteEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

impl RemoteEmbeddingProvider {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(RagError::ProviderUnavailable(
                "missing remote embedding model name".into(),
            ));
        }
        let client = build_client(api_key, timeout)?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            max_retries,
        })
    }

    /// Build from config, resolving the key from `embedding.api_key` or `OPENAI_API_KEY`.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = resolve_api_key(config.api_key.as_deref()).ok_or_else(|| {
            RagError::ProviderUnavailable(format!(
                "no API key for remote embeddings: set embedding.api_key or {API_KEY_ENV}"
            ))
        })?;
        Self::new(
            &api_key,
            &config.base_url,
            &config.remote_model,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    fn should_retry(&self, status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

/// Blocking client with bearer auth and JSON content type preset.
pub(crate) fn build_client(api_key: &str, timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
            .map_err(|_| RagError::ProviderUnavailable("invalid API key".into()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| RagError::ProviderUnavailable(format!("failed to build HTTP client: {e}")))
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn id(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: [text],
            };
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().map_err(|e| {
                            RagError::ProviderError(format!(
                                "failed to parse embedding response: {e}"
                            ))
                        })?;
                        return parsed
                            .data
                            .into_iter()
                            .next()
                            .map(|entry| entry.embedding)
                            .ok_or_else(|| {
                                RagError::ProviderError("embedding response had no data".into())
                            });
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if self.should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(%status, attempt, "embedding request failed, retrying");
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    return Err(RagError::ProviderError(format!(
                        "embeddings request failed ({status}): {body}"
                    )));
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            error = %err,
                            attempt,
                            "embedding endpoint unreachable, retrying"
                        );
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    return Err(RagError::ProviderUnavailable(format!(
                        "embedding endpoint {}: {err}",
                        self.endpoint
                    )));
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
