//! Live integration tests against a real vector index and embedding model.
//!
//! Ignored by default because they download an embedding model (~100MB) and
//! need a running qdrant server.
//!
//! ```bash
//! # Start qdrant, then:
//! QDRANT_URL=http://localhost:6334 cargo test -p agentic-rag --test live -- --ignored
//! ```

use agentic_rag::{
    index_document, search_collection, Chunker, Embedder, IndexOutcome, VectorIndex,
    VectorIndexConfig,
};

fn test_collection() -> String {
    format!("live_test_{}", uuid::Uuid::new_v4().simple())
}

fn sample_documents() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "rust_intro.md",
            "Rust is a systems programming language focused on safety, speed, and concurrency. \
             It achieves memory safety without garbage collection through its ownership system.",
        ),
        (
            "python_intro.md",
            "Python is a high-level, interpreted programming language known for its simple \
             syntax and readability.",
        ),
        (
            "machine_learning.md",
            "Machine learning is a subset of artificial intelligence that enables computers to \
             learn from data without being explicitly programmed.",
        ),
    ]
}

#[tokio::test]
#[ignore]
async fn index_and_search_round_trip() {
    let index = VectorIndex::connect(&VectorIndexConfig::from_env()).unwrap();
    let mut embedder = Embedder::default_model().unwrap();
    let chunker = Chunker::with_defaults().unwrap();
    let collection = test_collection();

    for (name, text) in sample_documents() {
        let outcome = index_document(
            &index,
            &mut embedder,
            &chunker,
            &collection,
            name,
            text,
            "text/markdown",
        )
        .await
        .unwrap();
        assert!(matches!(outcome, IndexOutcome::Indexed { .. }));
    }

    let hits = search_collection(
        &index,
        &mut embedder,
        &collection,
        "memory safety and ownership",
        3,
        None,
    )
    .await
    .unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].filename, "rust_intro.md");

    index.delete_collection(&collection).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn reindexing_unchanged_document_is_a_noop() {
    let index = VectorIndex::connect(&VectorIndexConfig::from_env()).unwrap();
    let mut embedder = Embedder::default_model().unwrap();
    let chunker = Chunker::with_defaults().unwrap();
    let collection = test_collection();

    let text = "The quick brown fox jumps over the lazy dog.";
    let first = index_document(
        &index,
        &mut embedder,
        &chunker,
        &collection,
        "fox.txt",
        text,
        "text/plain",
    )
    .await
    .unwrap();
    assert!(matches!(first, IndexOutcome::Indexed { .. }));

    let second = index_document(
        &index,
        &mut embedder,
        &chunker,
        &collection,
        "fox.txt",
        text,
        "text/plain",
    )
    .await
    .unwrap();
    assert_eq!(second, IndexOutcome::Unchanged);

    let changed = index_document(
        &index,
        &mut embedder,
        &chunker,
        &collection,
        "fox.txt",
        "The slow brown fox naps under the busy dog.",
        "text/plain",
    )
    .await
    .unwrap();
    assert!(matches!(changed, IndexOutcome::Replaced { .. }));

    index.delete_collection(&collection).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn delete_document_removes_all_chunks() {
    let index = VectorIndex::connect(&VectorIndexConfig::from_env()).unwrap();
    let mut embedder = Embedder::default_model().unwrap();
    let chunker = Chunker::new(200, 40).unwrap();
    let collection = test_collection();

    let text = "A long enough document to produce several chunks. ".repeat(30);
    index_document(
        &index,
        &mut embedder,
        &chunker,
        &collection,
        "long.txt",
        &text,
        "text/plain",
    )
    .await
    .unwrap();

    let documents = index.list_documents(&collection).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert!(documents[0].chunk_count > 1);

    let removed = index
        .delete_document(&collection, &documents[0].document_id)
        .await
        .unwrap();
    assert_eq!(removed, documents[0].chunk_count);
    assert!(index.list_documents(&collection).await.unwrap().is_empty());

    index.delete_collection(&collection).await.unwrap();
}
