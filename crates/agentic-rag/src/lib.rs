//! Retrieval-augmented generation helpers: document chunking, local text
//! embeddings and a vector index wrapper, tied together by a small indexing
//! and search pipeline.

pub mod chunker;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod pipeline;

pub use chunker::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use document::{
    document_id_for, fingerprint, prepare_document_metadata, DocumentMetadata, DocumentStatus,
};
pub use embeddings::{Embedder, DEFAULT_EMBEDDING_MODEL};
pub use error::{RagError, Result};
pub use index::{
    ChunkRecord, DocumentInfo, DocumentSummary, SearchHit, VectorIndex, VectorIndexConfig,
};
pub use pipeline::{index_document, search_collection, IndexOutcome};
