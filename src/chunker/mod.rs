//! Chunking module - split document text into overlapping windows

mod simple;

pub use simple::{Chunks, SimpleChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// A text chunk with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// File name of the originating document
    pub source: String,
    /// Coarse label inferred from the file name
    pub category: String,
}
