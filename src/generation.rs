//! Answer generation from a grounding prompt.
//!
//! The pipeline only needs `prompt -> answer text`; [`Generator`] is that seam.
//! [`OpenAiGenerator`] talks to an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::{resolve_api_key, GenerationConfig, API_KEY_ENV};
use crate::embedding::remote::build_client;
use crate::error::{RagError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub trait Generator: Send + Sync {
    fn id(&self) -> String;

    fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(api_key, REQUEST_TIMEOUT)?,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl Generator for OpenAiGenerator {
    fn id(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| RagError::ProviderUnavailable(format!("chat completions: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::GenerationError(format!(
                "chat completions returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| RagError::GenerationError(format!("failed to parse response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| RagError::GenerationError("response had no choices".into()))
    }
}

/// Create the generator named by `config.provider`; `"none"` yields `None`.
pub fn create_generator(config: &GenerationConfig) -> Result<Option<Box<dyn Generator>>> {
    if config.is_disabled() {
        return Ok(None);
    }
    match config.provider.trim().to_lowercase().as_str() {
        "openai" => {
            let api_key = resolve_api_key(config.api_key.as_deref()).ok_or_else(|| {
                RagError::ProviderUnavailable(format!(
                    "no API key for generation: set generation.api_key or {API_KEY_ENV}"
                ))
            })?;
            Ok(Some(Box::new(OpenAiGenerator::new(&api_key, config)?)))
        }
        other => Err(RagError::ProviderUnavailable(format!(
            "unknown generation provider: {other}. Supported: none, openai"
        ))),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
