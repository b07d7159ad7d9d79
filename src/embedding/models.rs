//! Registry of known embedding models
//!
//! Scores are raw inner products, so ranking only approximates cosine
//! similarity when the model emits unit-length vectors. The registry records
//! which models do, so the pipeline can warn about the ones that don't.

/// Known properties of an embedding model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Whether embeddings are L2 normalized
    pub normalized: bool,
    /// Embedding dimensions
    pub dimensions: usize,
}

/// Look up a model by name, ignoring version tags like `:latest` and
/// organization prefixes like `sentence-transformers/`
pub fn get_model_config(model_name: &str) -> Option<ModelConfig> {
    let base_name = model_name.split(':').next().unwrap_or(model_name);
    let base_name = base_name.rsplit('/').next().unwrap_or(base_name);

    let config = match base_name {
        "all-minilm" | "all-MiniLM-L6-v2" | "all-MiniLM-L12-v2" => ModelConfig {
            normalized: true,
            dimensions: 384,
        },
        "all-mpnet-base-v2" => ModelConfig {
            normalized: true,
            dimensions: 768,
        },
        "nomic-embed-text" | "nomic-embed-text-v1.5" => ModelConfig {
            normalized: true,
            dimensions: 768,
        },
        "mxbai-embed-large" | "mxbai-embed-large-v1" => ModelConfig {
            normalized: true,
            dimensions: 1024,
        },
        "bge-small-en-v1.5" | "bge-base-en-v1.5" | "bge-large-en-v1.5" => ModelConfig {
            normalized: true,
            dimensions: match base_name {
                s if s.contains("small") => 384,
                s if s.contains("large") => 1024,
                _ => 768,
            },
        },
        "text-embedding-3-small" | "text-embedding-ada-002" => ModelConfig {
            normalized: true,
            dimensions: 1536,
        },
        "text-embedding-3-large" => ModelConfig {
            normalized: true,
            dimensions: 3072,
        },
        // Raw BERT pooled output is not unit length
        "bert-base-uncased" => ModelConfig {
            normalized: false,
            dimensions: 768,
        },
        _ => return None,
    };

    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minilm_variants() {
        let ollama = get_model_config("all-minilm:latest").unwrap();
        let hub = get_model_config("sentence-transformers/all-MiniLM-L6-v2").unwrap();
        assert_eq!(ollama, hub);
        assert_eq!(hub.dimensions, 384);
        assert!(hub.normalized);
    }

    #[test]
    fn test_unnormalized_model() {
        let config = get_model_config("bert-base-uncased").unwrap();
        assert!(!config.normalized);
    }

    #[test]
    fn test_unknown_model() {
        assert!(get_model_config("some-unknown-model").is_none());
    }
}
