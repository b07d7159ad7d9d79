//! Metadata store - one record per indexed vector, in insertion order
//!
//! Persisted as JSON Lines: line `i` describes vector `i`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;
use crate::error::{RagError, Result};

/// File name of the metadata artifact inside an output directory
pub const METADATA_FILE: &str = "metadata.jsonl";

/// Provenance record for one indexed chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub source: String,
    #[serde(rename = "mission", alias = "category")]
    pub category: String,
}

impl From<Chunk> for ChunkRecord {
    fn from(chunk: Chunk) -> Self {
        Self {
            text: chunk.text,
            source: chunk.source,
            category: chunk.category,
        }
    }
}

/// Ordered record sequence parallel to the vector index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<ChunkRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: ChunkRecord) {
        self.records.push(record);
    }

    pub fn get(&self, position: usize) -> Option<&ChunkRecord> {
        self.records.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all records to `path`, one JSON object per line
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| RagError::io(format!("creating {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);

        for record in &self.records {
            let json = serde_json::to_string(record).map_err(|e| RagError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("cannot encode record: {}", e),
            })?;
            writer
                .write_all(json.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| RagError::io(format!("writing {}", path.display()), e))?;
        }

        writer
            .flush()
            .and_then(|_| writer.get_ref().sync_all())
            .map_err(|e| RagError::io(format!("writing {}", path.display()), e))
    }

    /// Read records from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| RagError::io(format!("opening metadata {}", path.display()), e))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| RagError::io(format!("reading {}", path.display()), e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ChunkRecord =
                serde_json::from_str(&line).map_err(|e| RagError::Corrupt {
                    path: path.to_path_buf(),
                    reason: format!("line {}: {}", line_no + 1, e),
                })?;
            records.push(record);
        }

        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn record(text: &str, source: &str, category: &str) -> ChunkRecord {
        ChunkRecord {
            text: text.to_string(),
            source: source.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_round_trip_preserves_whitespace_and_punctuation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(METADATA_FILE);

        let mut store = MetadataStore::new();
        store.push(record(
            "CAPCOM: Roger.\n\tStand by...\r\n  \"quoted\" \\ backslash ✓",
            "apollo13_transcript.txt",
            "Apollo 13",
        ));
        store.push(record("   ", "apollo11_log.txt", "Apollo 11"));
        store.push(record("", "mission_x.txt", "Unknown"));
        store.write(&path).unwrap();

        let loaded = MetadataStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(record("t", "s.txt", "Apollo 11")).unwrap();
        assert_eq!(json["mission"], "Apollo 11");
        assert_eq!(json["source"], "s.txt");

        let parsed: ChunkRecord =
            serde_json::from_str(r#"{"text":"t","source":"s.txt","category":"Apollo 13"}"#)
                .unwrap();
        assert_eq!(parsed.category, "Apollo 13");
    }

    #[test]
    fn test_load_reports_bad_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(METADATA_FILE);
        std::fs::write(
            &path,
            "{\"text\":\"a\",\"source\":\"a.txt\",\"mission\":\"Unknown\"}\nnot json\n",
        )
        .unwrap();

        match MetadataStore::load(&path) {
            Err(RagError::Corrupt { reason, .. }) => assert!(reason.starts_with("line 2")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
