//! Embedding module - compute embeddings from text

mod hash;
mod models;
mod ollama;
mod openai;
mod traits;

#[cfg(feature = "local-embeddings")]
mod candle;

pub use hash::DEFAULT_HASH_DIMENSIONS;
pub use models::{get_model_config, ModelConfig};
pub use traits::Embedder;

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{RagError, Result};

/// Embedding backend selection
#[derive(Debug, Clone)]
pub enum EmbeddingMode {
    Ollama {
        host: Option<String>,
    },
    OpenAI {
        api_key: Option<String>,
        base_url: Option<String>,
    },
    /// Offline feature hashing
    Hash {
        dimensions: usize,
    },
    #[cfg(feature = "local-embeddings")]
    Local {
        model_path: Option<String>,
    },
}

impl EmbeddingMode {
    /// Parse a provider name as used in config files and on the command line
    pub fn from_provider(
        provider: &str,
        host: Option<String>,
        base_url: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        match provider.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama { host }),
            "openai" => Ok(Self::OpenAI { api_key, base_url }),
            "hash" => Ok(Self::Hash {
                dimensions: DEFAULT_HASH_DIMENSIONS,
            }),
            #[cfg(feature = "local-embeddings")]
            "local" => Ok(Self::Local { model_path: None }),
            #[cfg(not(feature = "local-embeddings"))]
            "local" => Err(RagError::Configuration(
                "local embeddings not available. Rebuild with --features local-embeddings"
                    .to_string(),
            )),
            other => Err(RagError::Configuration(format!(
                "Unknown embedding provider: {}",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ollama { .. } => "ollama",
            Self::OpenAI { .. } => "openai",
            Self::Hash { .. } => "hash",
            #[cfg(feature = "local-embeddings")]
            Self::Local { .. } => "local",
        }
    }
}

/// Unified embedding provider
///
/// Loads its backend once. The output dimension is recorded from the first
/// successful call; any later call producing a different dimension fails.
pub struct EmbeddingProvider {
    model_name: String,
    mode_name: &'static str,
    dimensions: OnceLock<usize>,
    inner: EmbeddingProviderInner,
}

enum EmbeddingProviderInner {
    Ollama(ollama::OllamaEmbedding),
    OpenAI(openai::OpenAIEmbedding),
    Hash(hash::HashEmbedding),
    #[cfg(feature = "local-embeddings")]
    Local(candle::CandleEmbedding),
}

impl EmbeddingProvider {
    /// Create a new embedding provider
    pub fn new(model_name: String, mode: EmbeddingMode) -> Result<Self> {
        let mode_name = mode.name();
        let dimensions = OnceLock::new();

        let inner = match mode {
            EmbeddingMode::Ollama { host } => {
                EmbeddingProviderInner::Ollama(
                    ollama::OllamaEmbedding::new(model_name.clone(), host).map_err(model_error)?,
                )
            }
            EmbeddingMode::OpenAI { api_key, base_url } => EmbeddingProviderInner::OpenAI(
                openai::OpenAIEmbedding::new(model_name.clone(), api_key, base_url)
                    .map_err(model_error)?,
            ),
            EmbeddingMode::Hash { dimensions: dims } => {
                let provider = hash::HashEmbedding::new(dims).map_err(model_error)?;
                let _ = dimensions.set(provider.dimensions());
                EmbeddingProviderInner::Hash(provider)
            }
            #[cfg(feature = "local-embeddings")]
            EmbeddingMode::Local { model_path } => {
                // Hub models are addressed as org/name; bare Ollama-style tags are not
                let name = if model_path.is_none() && !model_name.contains('/') {
                    candle::DEFAULT_LOCAL_MODEL.to_string()
                } else {
                    model_name.clone()
                };
                let provider =
                    candle::CandleEmbedding::new(name, model_path).map_err(model_error)?;
                let _ = dimensions.set(provider.dimensions());
                EmbeddingProviderInner::Local(provider)
            }
        };

        info!(
            "Initialized embedding provider: {} via {}{}",
            model_name,
            mode_name,
            dimensions
                .get()
                .map(|d| format!(" ({} dims)", d))
                .unwrap_or_default()
        );

        match get_model_config(&model_name) {
            Some(config) if config.normalized => {}
            Some(_) => warn!(
                "Model {} does not emit unit-length vectors; inner-product ranking may not match cosine similarity",
                model_name
            ),
            None if mode_name != "hash" => debug!(
                "Model {} is not in the registry; assuming comparably scaled vectors",
                model_name
            ),
            None => {}
        }

        Ok(Self {
            model_name,
            mode_name,
            dimensions,
            inner,
        })
    }

    async fn embed_raw(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match &self.inner {
            EmbeddingProviderInner::Ollama(p) => p.embed(texts).await.map_err(model_error),
            EmbeddingProviderInner::OpenAI(p) => p.embed(texts).await.map_err(model_error),
            EmbeddingProviderInner::Hash(p) => Ok(p.embed(texts)),
            #[cfg(feature = "local-embeddings")]
            EmbeddingProviderInner::Local(p) => p.embed(texts).map_err(model_error),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn provider_name(&self) -> &str {
        self.mode_name
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions.get().copied()
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embed_raw(texts).await?;
        check_batch(texts.len(), &vectors, &self.dimensions)?;
        Ok(vectors)
    }
}

/// Verify a backend response: one vector per input, all of the session dimension
fn check_batch(expected: usize, vectors: &[Vec<f32>], dimensions: &OnceLock<usize>) -> Result<()> {
    if vectors.len() != expected {
        return Err(RagError::Model(format!(
            "expected {} embeddings, backend returned {}",
            expected,
            vectors.len()
        )));
    }

    let Some(first) = vectors.first() else {
        return Ok(());
    };
    if first.is_empty() {
        return Err(RagError::Model("backend returned empty vectors".to_string()));
    }

    let dims = *dimensions.get_or_init(|| {
        info!("Embedding dimensions: {}", first.len());
        first.len()
    });

    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(RagError::Consistency(format!(
            "embedding dimension mismatch: expected {}, got {}",
            dims,
            bad.len()
        )));
    }

    Ok(())
}

fn model_error(e: anyhow::Error) -> RagError {
    RagError::Model(format!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_provider() -> EmbeddingProvider {
        EmbeddingProvider::new("hash".to_string(), EmbeddingMode::Hash { dimensions: 32 }).unwrap()
    }

    #[tokio::test]
    async fn test_batch_and_single_agree() {
        let provider = hash_provider();
        let batch = provider.embed(&["first chunk", "second chunk"]).await.unwrap();
        let single = provider.embed_one("second chunk").await.unwrap();
        assert_eq!(batch[1], single);
        assert_eq!(provider.dimensions(), Some(32));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = hash_provider();
        assert!(provider.embed(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_dimension_recorded_on_first_batch() {
        let dims = OnceLock::new();
        check_batch(2, &[vec![0.0; 4], vec![1.0; 4]], &dims).unwrap();
        assert_eq!(dims.get(), Some(&4));

        let err = check_batch(1, &[vec![0.0; 5]], &dims).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Consistency);
    }

    #[test]
    fn test_count_mismatch_is_model_error() {
        let dims = OnceLock::new();
        let err = check_batch(3, &[vec![0.0; 4]], &dims).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Model);
    }

    #[test]
    fn test_mode_from_provider() {
        assert_eq!(
            EmbeddingMode::from_provider("Ollama", None, None, None).unwrap().name(),
            "ollama"
        );
        assert_eq!(
            EmbeddingMode::from_provider("hash", None, None, None).unwrap().name(),
            "hash"
        );
        assert!(EmbeddingMode::from_provider("word2vec", None, None, None).is_err());
    }
}
