//! Query path: embed the question, search, resolve context and build a grounding prompt.
//!
//! [`answer_question`] runs the whole path for one question and optionally
//! hands the prompt to a [`Generator`].

pub mod context;
pub mod prompt;
pub mod retriever;

pub use context::{ContextResolver, ContextSource, DatasetRefetch, RawDump, StoredText};
pub use prompt::build_prompt;
pub use retriever::{Retriever, SearchHit};

use serde::Serialize;

use crate::error::Result;
use crate::generation::Generator;

/// A hit together with the text shown for it.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedHit {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub context: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub hits: Vec<ResolvedHit>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Retrieve `k` hits for `question`, build the prompt, and generate an answer
/// when a generator is supplied.
pub fn answer_question(
    retriever: &Retriever,
    question: &str,
    k: usize,
    generator: Option<&dyn Generator>,
) -> Result<QueryOutcome> {
    let hits: Vec<ResolvedHit> = retriever
        .query(question, k)?
        .into_iter()
        .map(|hit| {
            let context = retriever.context(&hit);
            ResolvedHit { hit, context }
        })
        .collect();

    let contexts: Vec<&str> = hits.iter().map(|h| h.context.as_str()).collect();
    let prompt = build_prompt(&contexts, question);

    let answer = match generator {
        Some(generator) => {
            tracing::info!(generator = %generator.id(), "generating answer");
            Some(generator.generate(&prompt)?)
        }
        None => None,
    };

    Ok(QueryOutcome {
        hits,
        prompt,
        answer,
    })
}
