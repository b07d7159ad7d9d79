//! Index manifest stored alongside the vector and metadata artifacts

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// File name of the manifest inside an output directory
pub const MANIFEST_FILE: &str = "index.meta.json";

/// Current manifest format version
pub const MANIFEST_VERSION: &str = "1.0";

/// Describes how an index was built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Manifest format version
    pub version: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Embedding backend (ollama, openai, local, hash)
    pub embedding_mode: String,

    pub dimensions: usize,

    /// Number of vectors, equal to the number of metadata records
    pub record_count: usize,

    pub chunk_size: usize,

    pub chunk_overlap: usize,

    /// Unix timestamp (seconds) of the build
    #[serde(default)]
    pub created_at: u64,
}

impl IndexMeta {
    /// Load metadata from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::io(format!("reading {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| RagError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save metadata to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| RagError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content)
            .map_err(|e| RagError::io(format!("writing {}", path.display()), e))
    }
}
