use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{RagError, Result};

pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";

/// Map a model name to the fastembed variant and its output dimensionality.
pub(crate) fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize)> {
    match name {
        "BAAI/bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
        "BAAI/bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
        "BAAI/bge-large-en-v1.5" => Some((EmbeddingModel::BGELargeENV15, 1024)),
        "sentence-transformers/all-MiniLM-L6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
        _ => None,
    }
}

/// Wrapper over the fastembed text embedding model.
pub struct Embedder {
    model: TextEmbedding,
    model_name: String,
    dimensions: usize,
}

impl Embedder {
    pub fn new(model_name: &str) -> Result<Self> {
        let (variant, dimensions) = resolve_model(model_name).ok_or_else(|| {
            RagError::InvalidInput(format!("unknown embedding model '{model_name}'"))
        })?;
        let model = TextEmbedding::try_new(
            InitOptions::new(variant).with_show_download_progress(false),
        )
        .map_err(|e| RagError::Embedding(e.to_string()))?;
        Ok(Self {
            model,
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn default_model() -> Result<Self> {
        Self::new(DEFAULT_EMBEDDING_MODEL)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed(&mut self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        self.model
            .embed(texts, None)
            .map_err(|e| RagError::Embedding(e.to_string()))
    }

    pub fn embed_query(&mut self, query: &str) -> Result<Vec<f32>> {
        self.embed(vec![query])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("model returned no embedding".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_resolve_with_dimensions() {
        let (_, dims) = resolve_model(DEFAULT_EMBEDDING_MODEL).unwrap();
        assert_eq!(dims, 384);
        let (_, dims) = resolve_model("BAAI/bge-base-en-v1.5").unwrap();
        assert_eq!(dims, 768);
        assert!(resolve_model("not-a-model").is_none());
    }
}
