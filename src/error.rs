//! Error types for the indexing pipeline and retrieval path

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, RagError>;

/// Coarse error kind, for callers that branch on the failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Consistency,
    Model,
    NotReady,
}

/// Errors raised by the core
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking parameters, invalid `k`, bad config values
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Filesystem failure while reading sources or reading/writing artifacts
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A persisted artifact exists but cannot be decoded
    #[error("Corrupt artifact {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Index and metadata disagree, or vector dimensions do not line up
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Embedding computation failed
    #[error("Embedding model error: {0}")]
    Model(String),

    /// Retrieval attempted before an index was loaded
    #[error("Retriever is not initialized; load an index first")]
    NotReady,
}

impl RagError {
    /// Wrap an I/O error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Io { .. } | Self::Corrupt { .. } => ErrorKind::Io,
            Self::Consistency(_) => ErrorKind::Consistency,
            Self::Model(_) => ErrorKind::Model,
            Self::NotReady => ErrorKind::NotReady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_is_io_kind() {
        let err = RagError::Corrupt {
            path: PathBuf::from("vectors.index"),
            reason: "bad magic".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_io_context_in_message() {
        let err = RagError::io(
            "reading apollo11.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("reading apollo11.txt"));
    }
}
