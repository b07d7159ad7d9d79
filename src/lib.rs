//! missionrag - semantic search over mission transcripts
//!
//! The offline half chunks a directory of text files, embeds every chunk and
//! persists an exact inner-product index with a parallel metadata store. The
//! online half embeds a query with the same [`Embedder`], searches the index
//! and formats the best matches into a context block for answer generation.

pub mod chunker;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod http;
pub mod index;
pub mod llm;
pub mod loader;
pub mod pipeline;

pub use chunker::{Chunk, SimpleChunker};
pub use config::Config;
pub use context::format_context;
pub use embedding::{Embedder, EmbeddingMode, EmbeddingProvider};
pub use error::{ErrorKind, RagError, Result};
pub use index::{ChunkRecord, IndexBuilder, RetrievalHit, Retriever};
pub use loader::{detect_category, load_documents, LoadReport};
pub use pipeline::{build_index, BuildSummary};
