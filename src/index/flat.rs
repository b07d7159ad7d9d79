//! Exact inner-product vector index
//!
//! Vectors are stored row-major in insertion order; position `i` is the
//! `i`-th vector added. Search scans every row.
//!
//! On-disk layout (little endian):
//!
//! ```text
//! magic "MRFX" | version u32 | dimensions u32 | count u64 | count * dimensions f32
//! ```

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::error::{RagError, Result};

/// File name of the vector artifact inside an output directory
pub const INDEX_FILE: &str = "vectors.index";

const MAGIC: &[u8; 4] = b"MRFX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Flat (brute-force) index scored by raw inner product
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector; its position is the previous length
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimensions {
            return Err(RagError::Consistency(format!(
                "embedding dimension mismatch: index has {}, vector has {}",
                self.dimensions,
                vector.len()
            )));
        }
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Top `k` positions by descending inner product
    ///
    /// Equal scores keep insertion order. NaN scores sort last.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(RagError::Consistency(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimensions
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .map(|row| dot_product(query, row))
            .enumerate()
            .collect();

        scored.sort_by(|a, b| descending(a.1, b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored)
    }

    /// Serialize to `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| RagError::io(format!("creating {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);

        let write_all = |writer: &mut BufWriter<File>| -> std::io::Result<()> {
            writer.write_all(MAGIC)?;
            writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
            writer.write_all(&(self.dimensions as u32).to_le_bytes())?;
            writer.write_all(&(self.len() as u64).to_le_bytes())?;
            for value in &self.data {
                writer.write_all(&value.to_le_bytes())?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()
        };

        write_all(&mut writer).map_err(|e| RagError::io(format!("writing {}", path.display()), e))
    }

    /// Deserialize from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| RagError::io(format!("opening vector index {}", path.display()), e))?;

        let file_len = file
            .metadata()
            .map_err(|e| RagError::io(format!("reading {}", path.display()), e))?
            .len();
        if (file_len as usize) < HEADER_LEN {
            return Err(corrupt(path, "file shorter than header"));
        }

        // Safety: the mapping is read-only and copied out before returning
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| RagError::io(format!("mapping {}", path.display()), e))?;

        if &mmap[0..4] != MAGIC {
            return Err(corrupt(path, "bad magic bytes"));
        }
        let version = read_u32(&mmap[4..8]);
        if version != FORMAT_VERSION {
            return Err(corrupt(path, &format!("unsupported format version {}", version)));
        }
        let dimensions = read_u32(&mmap[8..12]) as usize;
        let count = u64::from_le_bytes([
            mmap[12], mmap[13], mmap[14], mmap[15], mmap[16], mmap[17], mmap[18], mmap[19],
        ]) as usize;

        if dimensions == 0 {
            return Err(corrupt(path, "zero dimensions"));
        }

        let expected = count
            .checked_mul(dimensions)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| corrupt(path, "header sizes overflow"))?;
        if mmap.len() != expected {
            return Err(corrupt(
                path,
                &format!(
                    "expected {} bytes for {} x {} vectors, found {}",
                    expected,
                    count,
                    dimensions,
                    mmap.len()
                ),
            ));
        }

        let data = mmap[HEADER_LEN..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self { dimensions, data })
    }
}

/// Inner product between two vectors of equal length
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn corrupt(path: &Path, reason: &str) -> RagError {
    RagError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn index_of(rows: &[[f32; 3]]) -> FlatIndex {
        let mut index = FlatIndex::new(3);
        for row in rows {
            index.add(row).unwrap();
        }
        index
    }

    #[test]
    fn test_search_orders_by_inner_product() {
        let index = index_of(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.5, 0.5, 0.0]]);
        let hits = index.search(&[0.2, 0.9, 0.0], 2).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2]);
        assert!((hits[0].1 - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_unnormalized_vectors_use_raw_score() {
        // Cosine would prefer position 0; raw inner product prefers the longer vector
        let index = index_of(&[[1.0, 0.0, 0.0], [3.0, 3.0, 0.0]]);
        let hits = index.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].0, 1);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_of(&[[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let hits = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = index_of(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert_eq!(index.search(&[1.0, 1.0, 0.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn test_nan_scores_sort_last() {
        let index = index_of(&[[f32::NAN, 0.0, 0.0], [0.1, 0.0, 0.0]]);
        let hits = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(3);
        assert!(matches!(index.add(&[1.0, 2.0]), Err(RagError::Consistency(_))));
        index.add(&[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(index.search(&[1.0], 1), Err(RagError::Consistency(_))));
    }

    #[test]
    fn test_write_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(INDEX_FILE);
        let index = index_of(&[[1.0, -2.5, 3.25], [0.0, 1e-8, -0.0]]);
        index.write(&path).unwrap();

        let loaded = FlatIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(
            loaded.search(&[1.0, 1.0, 1.0], 2).unwrap(),
            index.search(&[1.0, 1.0, 1.0], 2).unwrap()
        );
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(INDEX_FILE);
        index_of(&[[1.0, 2.0, 3.0]]).write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

        assert!(matches!(FlatIndex::load(&path), Err(RagError::Corrupt { .. })));
    }

    #[test]
    fn test_load_rejects_foreign_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(INDEX_FILE);
        std::fs::write(&path, b"IxFl this is a faiss index, honest").unwrap();
        assert!(matches!(FlatIndex::load(&path), Err(RagError::Corrupt { .. })));
    }

    #[test]
    fn test_load_missing_file_is_io() {
        let tmp = TempDir::new().unwrap();
        let err = FlatIndex::load(&tmp.path().join(INDEX_FILE)).unwrap_err();
        assert!(matches!(err, RagError::Io { .. }));
    }
}
