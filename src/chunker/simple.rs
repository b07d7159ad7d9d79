//! Fixed-size character window chunking with overlap

use crate::error::{RagError, Result};

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap between consecutive chunks in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Simple chunker that splits text into fixed-size overlapping windows
///
/// Sizes are counted in Unicode scalar values, so a window never splits a
/// multi-byte character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SimpleChunker {
    /// Create a chunker, rejecting windows that would never advance
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Distance between the starts of consecutive windows
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Lazily split `text` into windows
    pub fn chunk<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            start: 0,
            size: self.chunk_size,
            step: self.step(),
            done: text.is_empty(),
        }
    }
}

impl Default for SimpleChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Iterator over the windows of one document
///
/// The window that reaches the end of the text is the last one emitted; a
/// trailing window fully contained in its predecessor is never produced.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    /// Byte offset of the next window
    start: usize,
    size: usize,
    step: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    /// Byte offset `chars` characters past `from`, clipped to the text end
    fn advance(&self, from: usize, chars: usize) -> usize {
        self.text[from..]
            .char_indices()
            .nth(chars)
            .map(|(offset, _)| from + offset)
            .unwrap_or(self.text.len())
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.start >= self.text.len() {
            return None;
        }

        let end = self.advance(self.start, self.size);
        let window = &self.text[self.start..end];

        if end >= self.text.len() {
            self.done = true;
        } else {
            self.start = self.advance(self.start, self.step);
        }

        Some(window)
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
