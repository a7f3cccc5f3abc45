//! Tests for the retrieval policy.

mod common;

use std::sync::Arc;

use docqa_rag::{IndexBuilder, RagError, RetrievalPolicy, Retriever, SemanticIndex, split};

use common::{KeywordEmbedder, PUMP_KEYWORDS, pump_segments};

async fn pump_index(embedder: Arc<KeywordEmbedder>) -> SemanticIndex {
    let chunks = split(&pump_segments(), 40, 10).unwrap();
    IndexBuilder::new(embedder).build(chunks).await.unwrap()
}

#[tokio::test]
async fn most_similar_chunk_comes_first() {
    let embedder = Arc::new(KeywordEmbedder::new(&PUMP_KEYWORDS));
    let index = pump_index(embedder.clone()).await;
    let retriever = Retriever::new(embedder, RetrievalPolicy::new(2));

    let results = retriever.retrieve_scored(&index, "How much lubricant?").await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.text, "The pump requires 5 liters of lubricant.");
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn min_score_filters_weak_matches() {
    let embedder = Arc::new(KeywordEmbedder::new(&PUMP_KEYWORDS));
    let index = pump_index(embedder.clone()).await;
    let retriever = Retriever::new(embedder, RetrievalPolicy::new(2).with_min_score(0.9));

    let chunks = retriever.retrieve(&index, "How much lubricant?").await.unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].index, 0);
}

#[tokio::test]
async fn zero_k_skips_embedding_and_search() {
    let embedder = Arc::new(KeywordEmbedder::new(&PUMP_KEYWORDS));
    let index = pump_index(embedder.clone()).await;
    let calls_after_build = embedder.call_count();
    let retriever = Retriever::new(embedder.clone(), RetrievalPolicy::new(0));

    let chunks = retriever.retrieve(&index, "How much lubricant?").await.unwrap();

    assert!(chunks.is_empty());
    assert_eq!(embedder.call_count(), calls_after_build);
}

#[tokio::test]
async fn retrieval_is_deterministic() {
    let embedder = Arc::new(KeywordEmbedder::new(&PUMP_KEYWORDS));
    let index = pump_index(embedder.clone()).await;
    let retriever = Retriever::new(embedder, RetrievalPolicy::new(2));

    let first = retriever.retrieve(&index, "oil viscosity").await.unwrap();
    let second = retriever.retrieve(&index, "oil viscosity").await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn empty_index_retrieves_nothing() {
    let embedder = Arc::new(KeywordEmbedder::new(&PUMP_KEYWORDS));
    let retriever = Retriever::new(embedder, RetrievalPolicy::new(4));

    let chunks = retriever.retrieve(&SemanticIndex::empty(), "anything").await.unwrap();

    assert!(chunks.is_empty());
}

#[tokio::test]
async fn query_embedding_failure_is_reported() {
    let embedder = Arc::new(common::FailingEmbedder::new(&PUMP_KEYWORDS, "?"));
    let retriever = Retriever::new(embedder, RetrievalPolicy::new(4));

    let err = retriever.retrieve(&SemanticIndex::empty(), "How much?").await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingFailure { .. }));
}

#[tokio::test]
async fn nan_min_score_is_invalid() {
    let embedder = Arc::new(KeywordEmbedder::new(&PUMP_KEYWORDS));
    let retriever = Retriever::new(embedder, RetrievalPolicy::new(4).with_min_score(f32::NAN));

    let err = retriever.retrieve(&SemanticIndex::empty(), "anything").await.unwrap_err();

    assert!(matches!(err, RagError::InvalidConfiguration(_)));
}
