//! Embedder trait shared by the indexing pipeline and the retriever

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Maps text to dense vectors in one fixed embedding space
///
/// Index-time and query-time embeddings must come from the same implementor;
/// the pipeline and the retriever both take it as an injected dependency.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name of the underlying model, recorded in the index manifest
    fn model_name(&self) -> &str;

    /// Backend family, recorded in the index manifest
    fn provider_name(&self) -> &str {
        "custom"
    }

    /// Output dimension, if it is already known
    fn dimensions(&self) -> Option<usize>;

    /// Compute one vector per input text, in input order
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Compute the vector for a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Model("embedder returned no vector".to_string()))
    }
}
