use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("vector store error: {0}")]
    Vector(#[from] qdrant_client::QdrantError),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("chunking error: {0}")]
    Chunking(String),

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    #[error("deletion incomplete: removed {deleted} chunks but expected {expected}")]
    DeleteMismatch { expected: usize, deleted: usize },

    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
