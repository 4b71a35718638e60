//! Grounding prompt assembly.

/// Separates context blocks in the prompt.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Build the grounding prompt for `question` from resolved context blocks.
///
/// The template tells the generator to answer only from the context and to
/// say it does not know when the context falls short.
pub fn build_prompt<S: AsRef<str>>(contexts: &[S], question: &str) -> String {
    let context = contexts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);
    format!(
        "You are a helpful assistant. Use only the context below to answer the question. \
         If the context does not contain the answer, say you don't know and suggest next steps.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}
