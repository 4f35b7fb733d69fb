//! End-to-end indexing and retrieval flows.

use qdrant_client::qdrant::Distance;

use crate::chunker::Chunker;
use crate::document::{prepare_document_metadata, DocumentStatus};
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::index::{ChunkRecord, SearchHit, VectorIndex};

/// What happened when a document was submitted for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// New document, chunks written.
    Indexed { chunks: usize },
    /// Document content changed; old chunks removed and re-written.
    Replaced { chunks: usize },
    /// Same filename and content already indexed, nothing to do.
    Unchanged,
    /// Identical content already indexed under another filename.
    Duplicate,
}

/// Chunk, embed and upsert one document into a collection.
///
/// The collection is created on first use with the embedder's
/// dimensionality. Re-submitting an unchanged document is a no-op, and a
/// changed document replaces its previous chunks.
pub async fn index_document(
    index: &VectorIndex,
    embedder: &mut Embedder,
    chunker: &Chunker,
    collection: &str,
    path_or_url: &str,
    text: &str,
    mime_type: &str,
) -> Result<IndexOutcome> {
    if text.trim().is_empty() {
        return Err(RagError::InvalidInput(format!(
            "document '{path_or_url}' has no text content"
        )));
    }

    let metadata = prepare_document_metadata(path_or_url, text, mime_type);
    index
        .ensure_collection(collection, embedder.dimensions() as u64, Distance::Cosine)
        .await?;

    let status = index
        .document_status(collection, &metadata.document_id, &metadata.fingerprint)
        .await?;
    match status {
        DocumentStatus::Unchanged => {
            tracing::info!(filename = %metadata.filename, "document unchanged, skipping");
            return Ok(IndexOutcome::Unchanged);
        }
        DocumentStatus::Duplicate => {
            tracing::info!(filename = %metadata.filename, "identical content already indexed");
            return Ok(IndexOutcome::Duplicate);
        }
        DocumentStatus::Changed => {
            let removed = index
                .delete_document(collection, &metadata.document_id)
                .await?;
            tracing::info!(filename = %metadata.filename, removed, "replacing changed document");
        }
        DocumentStatus::New => {}
    }

    let chunks = chunker.chunk(text);
    let vectors = embedder.embed(chunks.iter().map(String::as_str).collect())?;
    let records: Vec<ChunkRecord> = chunks
        .into_iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (content, vector))| ChunkRecord {
            content,
            chunk_index: i as i64,
            vector,
        })
        .collect();

    let written = index.upsert_chunks(collection, &metadata, records).await?;
    tracing::info!(
        collection = %collection,
        filename = %metadata.filename,
        chunks = written,
        "indexed document"
    );
    Ok(match status {
        DocumentStatus::Changed => IndexOutcome::Replaced { chunks: written },
        _ => IndexOutcome::Indexed { chunks: written },
    })
}

/// Embed a query and run similarity search over a collection.
pub async fn search_collection(
    index: &VectorIndex,
    embedder: &mut Embedder,
    collection: &str,
    query: &str,
    limit: u64,
    filter: Option<(String, String)>,
) -> Result<Vec<SearchHit>> {
    if !index.collection_exists(collection).await? {
        return Err(RagError::CollectionNotFound(collection.to_string()));
    }
    let query_vector = embedder.embed_query(query)?;
    let hits = index
        .search(collection, query_vector, limit, filter)
        .await?;
    tracing::debug!(collection = %collection, hits = hits.len(), "search complete");
    Ok(hits)
}
