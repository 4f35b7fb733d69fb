//! RAG Index Demo
//!
//! Indexes a text file into a vector collection and runs a similarity search
//! over it. Needs a running qdrant server (`QDRANT_URL`, default
//! `http://localhost:6334`); the embedding model is downloaded on first run.
//!
//! ```bash
//! cargo run -p rag-index -- notes.txt "what did we decide about caching?"
//! ```

use agentic::rag::{
    index_document, search_collection, Chunker, Embedder, IndexOutcome, VectorIndex,
    VectorIndexConfig,
};

const COLLECTION: &str = "demo_documents";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: rag-index <file> <query>"))?;
    let query = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: rag-index <file> <query>"))?;

    let text = std::fs::read_to_string(&path)?;

    let index = VectorIndex::connect(&VectorIndexConfig::from_env())?;
    let mut embedder = Embedder::default_model()?;
    let chunker = Chunker::with_defaults()?;

    let outcome = index_document(
        &index,
        &mut embedder,
        &chunker,
        COLLECTION,
        &path,
        &text,
        "text/plain",
    )
    .await?;
    match outcome {
        IndexOutcome::Indexed { chunks } => println!("Indexed {path} ({chunks} chunks)"),
        IndexOutcome::Replaced { chunks } => println!("Re-indexed {path} ({chunks} chunks)"),
        IndexOutcome::Unchanged => println!("{path} is unchanged, skipped"),
        IndexOutcome::Duplicate => println!("{path} matches content already indexed, skipped"),
    }

    let hits = search_collection(&index, &mut embedder, COLLECTION, &query, 5, None).await?;
    println!("\nTop matches for \"{query}\":");
    for (rank, hit) in hits.iter().enumerate() {
        let preview: String = hit.content.chars().take(120).collect();
        println!("{}. [{:.3}] {}: {}", rank + 1, hit.score, hit.filename, preview);
    }

    Ok(())
}
