//! Configuration file support
//!
//! Config file location: ~/.config/missionrag/config.toml
//!
//! Example config:
//! ```toml
//! [paths]
//! data_dir = "data"
//! out_dir = "embeddings"
//!
//! [build]
//! chunk_size = 800
//! chunk_overlap = 200
//!
//! [retrieval]
//! top_k = 3
//!
//! [embedding]
//! provider = "ollama"  # ollama, openai, local, hash
//! model = "all-minilm"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chunker::{SimpleChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{RagError, Result};
use crate::loader::{default_category_rules, CategoryRule};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Corpus and artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory of `.txt` source documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving the index artifacts
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            out_dir: default_out_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("embeddings")
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunk overlap in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Texts per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Ordered file-name rules for category inference
    #[serde(default = "default_category_rules")]
    pub categories: Vec<CategoryRule>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            categories: default_category_rules(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_batch_size() -> usize {
    64
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider type: ollama, openai, local, hash
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Host for Ollama (e.g., http://localhost:11434)
    pub host: Option<String>,

    /// Base URL for OpenAI-compatible APIs
    pub base_url: Option<String>,

    /// API key for OpenAI
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            host: None,
            base_url: None,
            api_key: None,
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider type: ollama, openai, simulated
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    pub host: Option<String>,

    pub base_url: Option<String>,

    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            host: None,
            base_url: None,
            api_key: None,
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("missionrag")
            .join("config.toml")
    }

    /// Load config from file, returning defaults if not found
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config file: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Check values the pipeline and retriever depend on
    pub fn validate(&self) -> Result<()> {
        self.chunker()?;
        if self.retrieval.top_k < 1 {
            return Err(RagError::Configuration(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.build.batch_size < 1 {
            return Err(RagError::Configuration(
                "build.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Chunker for the configured window
    pub fn chunker(&self) -> Result<SimpleChunker> {
        SimpleChunker::new(self.build.chunk_size, self.build.chunk_overlap)
    }
}
