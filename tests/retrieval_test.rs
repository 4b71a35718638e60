mod helpers;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use helpers::{survey_embedder, survey_records, EchoGenerator, FakeEmbedder, MemoryDataset, SURVEY};
use rowrag::error::RagError;
use rowrag::index::bundle::METADATA_FILE;
use rowrag::index::IndexBuilder;
use rowrag::normalize::normalize;
use rowrag::retrieval::{answer_question, Retriever};
use tempfile::TempDir;

/// Build the survey bundle into a temp dir and return both.
fn survey_bundle() -> (TempDir, Arc<MemoryDataset>) {
    let tmp = TempDir::new().unwrap();
    let dataset = Arc::new(MemoryDataset::with_source(SURVEY, survey_records()));
    IndexBuilder::new(&survey_embedder(), dataset.as_ref())
        .build(Path::new(SURVEY), tmp.path())
        .unwrap();
    (tmp, dataset)
}

fn clear_stored_text(dir: &Path) {
    let path = dir.join(METADATA_FILE);
    let mut docs: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for doc in docs.as_array_mut().unwrap() {
        doc["text"] = serde_json::Value::String(String::new());
    }
    std::fs::write(&path, serde_json::to_string_pretty(&docs).unwrap()).unwrap();
}

#[test]
fn query_matching_document_zero_ranks_it_first() {
    let (tmp, dataset) = survey_bundle();
    let retriever = Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset).unwrap();

    let hits = retriever.query("A: x", 5).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].position, 0);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert_eq!(hits[0].document.text, "A: x");
    assert_eq!(hits[1].position, 1);
    assert!(hits[1].score < 1.0);
    assert!((hits[1].score - 0.6).abs() < 1e-6);
}

#[test]
fn search_vector_respects_k() {
    let (tmp, dataset) = survey_bundle();
    let retriever = Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset).unwrap();

    let one = retriever.search_vector(&[0.0, 1.0, 0.0], 1).unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].position, 1);

    let all = retriever.search_vector(&[0.0, 1.0, 0.0], 50).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn query_with_wrong_dimension_is_error() {
    let (tmp, dataset) = survey_bundle();
    let retriever = Retriever::open(tmp.path(), Box::new(FakeEmbedder::new(8)), dataset).unwrap();
    let err = retriever.query("A: x", 2).unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 3,
            actual: 8
        }
    ));
}

#[test]
fn missing_bundle_is_index_not_found() {
    let tmp = TempDir::new().unwrap();
    let dataset = Arc::new(MemoryDataset::default());
    let err = Retriever::open(&tmp.path().join("absent"), Box::new(survey_embedder()), dataset)
        .err()
        .unwrap();
    assert!(matches!(err, RagError::IndexNotFound(_)));
}

#[test]
fn stored_text_is_shown_without_touching_dataset() {
    let (tmp, dataset) = survey_bundle();
    let reads_after_build = dataset.reads.load(Ordering::SeqCst);
    let retriever =
        Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset.clone()).unwrap();

    for hit in retriever.query("B: y", 2).unwrap() {
        assert_eq!(retriever.context(&hit), hit.document.text);
    }
    assert_eq!(dataset.reads.load(Ordering::SeqCst), reads_after_build);
}

#[test]
fn cleared_text_is_rebuilt_from_dataset_row() {
    let (tmp, dataset) = survey_bundle();
    clear_stored_text(tmp.path());
    let retriever =
        Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset.clone()).unwrap();

    let records = survey_records();
    let hits = retriever.query("A: x", 2).unwrap();
    assert!(hits.iter().all(|h| h.document.text.is_empty()));
    for hit in &hits {
        let expected = normalize(&records[hit.document.row_index]);
        assert_eq!(retriever.context(hit), expected);
    }
    assert_eq!(retriever.context(&hits[0]), "A: x");
}

#[test]
fn deleted_dataset_falls_back_to_raw_dump() {
    let (tmp, dataset) = survey_bundle();
    clear_stored_text(tmp.path());
    dataset.remove(SURVEY);
    let retriever =
        Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset.clone()).unwrap();

    let hits = retriever.query("B: y", 1).unwrap();
    let context = retriever.context(&hits[0]);
    let dumped: serde_json::Value = serde_json::from_str(&context).unwrap();
    assert_eq!(dumped["row"], 1);
    assert_eq!(dumped["source"], SURVEY);
}

#[test]
fn answer_question_grounds_prompt_in_hits() {
    let (tmp, dataset) = survey_bundle();
    let retriever = Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset).unwrap();
    let generator = EchoGenerator::new();

    let outcome = answer_question(&retriever, "A: x", 2, Some(&generator)).unwrap();

    assert_eq!(outcome.answer.as_deref(), Some("A is x."));
    assert_eq!(outcome.hits.len(), 2);
    assert_eq!(outcome.hits[0].context, "A: x");
    assert!(outcome
        .prompt
        .contains("Context:\nA: x\n\n---\n\nB: y\n\nQuestion: A: x"));

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.as_slice(), &[outcome.prompt.clone()]);
}

#[test]
fn answer_question_without_generator_returns_context_only() {
    let (tmp, dataset) = survey_bundle();
    let retriever = Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset).unwrap();

    let outcome = answer_question(&retriever, "B: y", 1, None).unwrap();
    assert!(outcome.answer.is_none());
    assert_eq!(outcome.hits[0].hit.position, 1);
    assert!(outcome.prompt.contains("B: y"));
}

#[test]
fn generation_failure_propagates() {
    let (tmp, dataset) = survey_bundle();
    let retriever = Retriever::open(tmp.path(), Box::new(survey_embedder()), dataset).unwrap();

    let err = answer_question(&retriever, "A: x", 2, Some(&EchoGenerator::failing())).unwrap_err();
    assert!(matches!(err, RagError::GenerationError(_)));
}
