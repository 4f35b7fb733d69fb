//! Thin wrapper over the qdrant client.
//!
//! Every operation here is a direct call into the client's query/filter/batch
//! API; this module only marshals parameters and shapes return values. The
//! chunk payload schema is fixed: `content`, `document_id`, `chunk_index`,
//! `filename`, `timestamp`, `mime_type`, `source_url`, `summary`,
//! `fingerprint`.

use std::collections::HashMap;

use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DeletePointsBuilder, Distance, FieldType, Filter, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder, Vectors,
};
use qdrant_client::Qdrant;
use serde::{Deserialize, Serialize};

use crate::document::{DocumentMetadata, DocumentStatus};
use crate::error::{RagError, Result};

/// Payload fields that get a keyword index for filtering.
const KEYWORD_FIELDS: &[&str] = &[
    "document_id",
    "filename",
    "mime_type",
    "source_url",
    "summary",
    "fingerprint",
];

const RENAME_SCROLL_BATCH: u32 = 256;
const LIST_DOCUMENTS_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl VectorIndexConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    /// Reads `QDRANT_URL` / `QDRANT_API_KEY`, defaulting to a local server.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6334".to_string()),
            api_key: std::env::var("QDRANT_API_KEY").ok(),
        }
    }
}

/// One embedded chunk ready for upsert.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub content: String,
    pub chunk_index: i64,
    pub vector: Vec<f32>,
}

/// Unique document listed from a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub filename: String,
    pub timestamp: String,
    pub chunk_count: usize,
}

/// Full metadata of an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub filename: String,
    pub timestamp: String,
    pub source_url: String,
    pub mime_type: String,
    pub fingerprint: String,
    pub summary: String,
    pub total_chunks: usize,
}

/// One vector search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub filename: String,
    pub content: String,
    pub source_url: String,
    pub timestamp: String,
    /// Similarity score reported by the engine (higher is closer).
    pub score: f32,
}

/// Handle to one qdrant server.
pub struct VectorIndex {
    client: Qdrant,
}

impl VectorIndex {
    pub fn connect(config: &VectorIndexConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build()?;
        tracing::debug!(url = %config.url, "connected to vector index");
        Ok(Self { client })
    }

    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.client.collection_exists(name).await?)
    }

    /// Create the collection with the standard chunk schema if it does not
    /// exist yet.
    pub async fn ensure_collection(
        &self,
        name: &str,
        dimensions: u64,
        distance: Distance,
    ) -> Result<()> {
        if self.collection_exists(name).await? {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions, distance)),
            )
            .await?;
        for field in KEYWORD_FIELDS {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    name,
                    *field,
                    FieldType::Keyword,
                ))
                .await?;
        }
        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                name,
                "chunk_index",
                FieldType::Integer,
            ))
            .await?;
        tracing::info!(collection = %name, dimensions, "created collection");
        Ok(())
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        if !self.collection_exists(name).await? {
            return Err(RagError::CollectionNotFound(name.to_string()));
        }
        self.client.delete_collection(name).await?;
        Ok(())
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.client.list_collections().await?;
        Ok(response
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// Rename by copying every point (with vectors) into a fresh collection
    /// and deleting the original once the copy succeeded.
    pub async fn rename_collection(
        &self,
        source: &str,
        target: &str,
        overwrite: bool,
        dimensions: u64,
        distance: Distance,
    ) -> Result<()> {
        if !self.collection_exists(source).await? {
            return Err(RagError::CollectionNotFound(source.to_string()));
        }
        if self.collection_exists(target).await? {
            if !overwrite {
                return Err(RagError::CollectionExists(target.to_string()));
            }
            self.client.delete_collection(target).await?;
        }
        self.ensure_collection(target, dimensions, distance).await?;

        let mut offset = None;
        loop {
            let mut scroll = ScrollPointsBuilder::new(source)
                .limit(RENAME_SCROLL_BATCH)
                .with_payload(true)
                .with_vectors(true);
            if let Some(next) = offset.take() {
                scroll = scroll.offset(next);
            }
            let page = self.client.scroll(scroll).await?;

            let points: Vec<PointStruct> = page
                .result
                .into_iter()
                .filter_map(|point| {
                    let vector = point.vectors.as_ref().and_then(|v| {
                        match v.vectors_options.as_ref()? {
                            VectorsOptions::Vector(dense) => Some(dense.data.clone()),
                            _ => None,
                        }
                    })?;
                    Some(PointStruct {
                        id: point.id,
                        payload: point.payload,
                        vectors: Some(Vectors::from(vector)),
                    })
                })
                .collect();
            if !points.is_empty() {
                self.client
                    .upsert_points(UpsertPointsBuilder::new(target, points).wait(true))
                    .await?;
            }

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        self.client.delete_collection(source).await?;
        tracing::info!(source = %source, target = %target, "renamed collection");
        Ok(())
    }

    /// Upsert embedded chunks for one document.
    pub async fn upsert_chunks(
        &self,
        collection: &str,
        metadata: &DocumentMetadata,
        chunks: Vec<ChunkRecord>,
    ) -> Result<usize> {
        let count = chunks.len();
        let mut points = Vec::with_capacity(count);
        for chunk in chunks {
            let mut payload: HashMap<String, Value> = HashMap::new();
            payload.insert("content".to_string(), chunk.content.into());
            payload.insert("document_id".to_string(), metadata.document_id.clone().into());
            payload.insert("chunk_index".to_string(), chunk.chunk_index.into());
            payload.insert("filename".to_string(), metadata.filename.clone().into());
            payload.insert("timestamp".to_string(), metadata.timestamp_rfc3339().into());
            payload.insert("mime_type".to_string(), metadata.mime_type.clone().into());
            payload.insert(
                "source_url".to_string(),
                metadata.source_url.clone().unwrap_or_default().into(),
            );
            payload.insert(
                "summary".to_string(),
                metadata.summary.clone().unwrap_or_default().into(),
            );
            payload.insert("fingerprint".to_string(), metadata.fingerprint.clone().into());
            points.push(PointStruct::new(
                uuid::Uuid::new_v4().to_string(),
                chunk.vector,
                payload,
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await?;
        tracing::debug!(collection = %collection, document_id = %metadata.document_id, chunks = count, "upserted chunks");
        Ok(count)
    }

    /// How a document relates to what the index already holds: same filename
    /// is checked first (unchanged vs changed content), then the fingerprint
    /// catches identical content under another name.
    pub async fn document_status(
        &self,
        collection: &str,
        document_id: &str,
        fingerprint: &str,
    ) -> Result<DocumentStatus> {
        if let Some(point) = self.first_match(collection, "document_id", document_id).await? {
            let existing = payload_str(&point, "fingerprint").unwrap_or_default();
            return Ok(if existing == fingerprint {
                DocumentStatus::Unchanged
            } else {
                DocumentStatus::Changed
            });
        }
        if self
            .first_match(collection, "fingerprint", fingerprint)
            .await?
            .is_some()
        {
            return Ok(DocumentStatus::Duplicate);
        }
        Ok(DocumentStatus::New)
    }

    pub async fn document_exists(&self, collection: &str, document_id: &str) -> Result<bool> {
        Ok(self
            .first_match(collection, "document_id", document_id)
            .await?
            .is_some())
    }

    /// Delete a document's chunks, verifying the index is clean afterwards.
    /// Returns the number of chunks removed.
    pub async fn delete_document(&self, collection: &str, document_id: &str) -> Result<usize> {
        let expected = self.count_chunks(collection, document_id).await?;
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(document_filter(document_id))
                    .wait(true),
            )
            .await?;
        let remaining = self.count_chunks(collection, document_id).await?;
        verify_deleted(expected, remaining)
    }

    /// All unique documents in a collection with basic metadata.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<DocumentSummary>> {
        let page = self
            .client
            .scroll(
                ScrollPointsBuilder::new(collection)
                    .limit(LIST_DOCUMENTS_LIMIT)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await?;

        let mut seen = std::collections::HashSet::new();
        let mut documents = Vec::new();
        for point in &page.result {
            let Some(document_id) = payload_str(&point.payload, "document_id") else {
                continue;
            };
            if !seen.insert(document_id.clone()) {
                continue;
            }
            let chunk_count = self.count_chunks(collection, &document_id).await?;
            documents.push(DocumentSummary {
                filename: payload_str(&point.payload, "filename").unwrap_or_default(),
                timestamp: payload_str(&point.payload, "timestamp").unwrap_or_default(),
                document_id,
                chunk_count,
            });
        }
        Ok(documents)
    }

    /// Full metadata for one document, or None when it is not indexed.
    pub async fn document_metadata(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<DocumentInfo>> {
        let Some(payload) = self.first_match(collection, "document_id", document_id).await?
        else {
            return Ok(None);
        };
        let total_chunks = self.count_chunks(collection, document_id).await?;
        Ok(Some(DocumentInfo {
            document_id: document_id.to_string(),
            filename: payload_str(&payload, "filename").unwrap_or_default(),
            timestamp: payload_str(&payload, "timestamp").unwrap_or_default(),
            source_url: payload_str(&payload, "source_url").unwrap_or_default(),
            mime_type: payload_str(&payload, "mime_type").unwrap_or_default(),
            fingerprint: payload_str(&payload, "fingerprint").unwrap_or_default(),
            summary: payload_str(&payload, "summary").unwrap_or_default(),
            total_chunks,
        }))
    }

    /// Vector search with an optional single equality filter on a payload
    /// field.
    pub async fn search(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
        filter: Option<(String, String)>,
    ) -> Result<Vec<SearchHit>> {
        let mut search = SearchPointsBuilder::new(collection, query_vector, limit)
            .with_payload(true);
        if let Some((field, value)) = filter {
            search = search.filter(Filter::must([Condition::matches(field, value)]));
        }
        let response = self.client.search_points(search).await?;

        Ok(response
            .result
            .into_iter()
            .map(|point| SearchHit {
                filename: payload_str(&point.payload, "filename").unwrap_or_default(),
                content: payload_str(&point.payload, "content").unwrap_or_default(),
                source_url: payload_str(&point.payload, "source_url").unwrap_or_default(),
                timestamp: payload_str(&point.payload, "timestamp").unwrap_or_default(),
                score: point.score,
            })
            .collect())
    }

    async fn count_chunks(&self, collection: &str, document_id: &str) -> Result<usize> {
        let response = self
            .client
            .count(
                CountPointsBuilder::new(collection)
                    .filter(document_filter(document_id))
                    .exact(true),
            )
            .await?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn first_match(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<HashMap<String, Value>>> {
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(collection)
                    .filter(Filter::must([Condition::matches(
                        field.to_string(),
                        value.to_string(),
                    )]))
                    .limit(1)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await?;
        Ok(response.result.into_iter().next().map(|p| p.payload))
    }
}

/// Check a post-delete recount. Concurrent upserts can leave more chunks than
/// the pre-count expected, so the deleted tally saturates instead of
/// underflowing.
fn verify_deleted(expected: usize, remaining: usize) -> Result<usize> {
    if remaining != 0 {
        return Err(RagError::DeleteMismatch {
            expected,
            deleted: expected.saturating_sub(remaining),
        });
    }
    Ok(expected)
}

fn document_filter(document_id: &str) -> Filter {
    Filter::must([Condition::matches(
        "document_id".to_string(),
        document_id.to_string(),
    )])
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key)?.as_str().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_delete_returns_the_precount() {
        assert_eq!(verify_deleted(4, 0).unwrap(), 4);
        assert_eq!(verify_deleted(0, 0).unwrap(), 0);
    }

    #[test]
    fn partial_delete_reports_how_many_went() {
        let err = verify_deleted(4, 1).unwrap_err();
        match err {
            RagError::DeleteMismatch { expected, deleted } => {
                assert_eq!(expected, 4);
                assert_eq!(deleted, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn concurrent_upserts_during_delete_do_not_underflow() {
        // More chunks after the delete than before it; the tally clamps to 0.
        let err = verify_deleted(2, 5).unwrap_err();
        match err {
            RagError::DeleteMismatch { expected, deleted } => {
                assert_eq!(expected, 2);
                assert_eq!(deleted, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
