//! Index builder - accumulates (vector, record) pairs and persists them

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::error::{RagError, Result};

use super::flat::{FlatIndex, INDEX_FILE};
use super::meta::{IndexMeta, MANIFEST_FILE, MANIFEST_VERSION};
use super::metadata::{ChunkRecord, MetadataStore, METADATA_FILE};

/// Describes the build for the manifest
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub embedding_model: String,
    pub embedding_mode: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Paths of a persisted index
#[derive(Debug, Clone)]
pub struct PersistedIndex {
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: IndexMeta,
}

/// Builder for a vector index and its parallel metadata store
///
/// Vectors and records only enter together through [`IndexBuilder::add`], so
/// position `i` of the index always describes `metadata[i]`.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: Option<FlatIndex>,
    metadata: MetadataStore,
}

impl IndexBuilder {
    /// Builder whose dimension is fixed by the first vector added
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with a known dimension
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            index: Some(FlatIndex::new(dimensions)),
            metadata: MetadataStore::new(),
        }
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.index.as_ref().map(|i| i.dimensions())
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Add one embedded chunk; returns its position
    pub fn add(&mut self, vector: &[f32], record: ChunkRecord) -> Result<usize> {
        if vector.is_empty() {
            return Err(RagError::Consistency(
                "cannot index an empty vector".to_string(),
            ));
        }
        let index = self
            .index
            .get_or_insert_with(|| FlatIndex::new(vector.len()));
        let position = index.add(vector)?;
        self.metadata.push(record);
        Ok(position)
    }

    /// Finish building without persisting
    pub fn into_parts(self) -> Result<(FlatIndex, MetadataStore)> {
        let index = self.index.ok_or_else(|| {
            RagError::Configuration("index has no vectors and no dimension".to_string())
        })?;
        Ok((index, self.metadata))
    }

    /// Write the index, metadata, and manifest into `out_dir`
    ///
    /// All three are first written as `.tmp` siblings, then renamed over the
    /// previous artifacts, manifest last. A failure before the renames leaves
    /// the previous build untouched; a failure during them is reported with
    /// the files that were already replaced, or with the removed manifest
    /// when none were.
    pub fn persist(self, out_dir: &Path, build: &BuildInfo) -> Result<PersistedIndex> {
        let record_count = self.len();
        let (index, metadata) = self.into_parts()?;

        info!(
            "Persisting index with {} records, {} dimensions to {:?}",
            record_count,
            index.dimensions(),
            out_dir
        );

        std::fs::create_dir_all(out_dir)
            .map_err(|e| RagError::io(format!("creating {}", out_dir.display()), e))?;

        let manifest = IndexMeta {
            version: MANIFEST_VERSION.to_string(),
            embedding_model: build.embedding_model.clone(),
            embedding_mode: build.embedding_mode.clone(),
            dimensions: index.dimensions(),
            record_count,
            chunk_size: build.chunk_size,
            chunk_overlap: build.chunk_overlap,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };

        let index_path = out_dir.join(INDEX_FILE);
        let metadata_path = out_dir.join(METADATA_FILE);
        let manifest_path = out_dir.join(MANIFEST_FILE);

        let staged = [
            (tmp_path(&index_path), index_path.clone()),
            (tmp_path(&metadata_path), metadata_path.clone()),
            (tmp_path(&manifest_path), manifest_path.clone()),
        ];

        let written = index
            .write(&staged[0].0)
            .and_then(|_| metadata.write(&staged[1].0))
            .and_then(|_| manifest.save(&staged[2].0));

        if let Err(e) = written {
            remove_staged(&staged);
            return Err(e);
        }

        // The manifest describes the pair; drop the stale one before swapping
        let manifest_removed = manifest_path.exists();
        if manifest_removed {
            std::fs::remove_file(&manifest_path).map_err(|e| {
                remove_staged(&staged);
                RagError::io(format!("removing stale {}", manifest_path.display()), e)
            })?;
        }

        let mut replaced: Vec<&str> = Vec::new();
        for (tmp, target) in &staged {
            if let Err(e) = std::fs::rename(tmp, target) {
                remove_staged(&staged);
                let context = if replaced.is_empty() && manifest_removed {
                    format!(
                        "replacing {}; the previous {} was already removed, so the old index has no manifest",
                        target.display(),
                        MANIFEST_FILE
                    )
                } else if replaced.is_empty() {
                    format!("replacing {}", target.display())
                } else {
                    format!(
                        "replacing {} after {} were already replaced; artifacts are inconsistent",
                        target.display(),
                        replaced.join(", ")
                    )
                };
                return Err(RagError::io(context, e));
            }
            replaced.push(file_name(target));
        }

        info!("Index persisted at {:?}", out_dir);

        Ok(PersistedIndex {
            index_path,
            metadata_path,
            manifest_path,
            manifest,
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("?")
}

fn remove_staged(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        if tmp.exists() {
            if let Err(e) = std::fs::remove_file(tmp) {
                warn!("Failed to remove staged file {}: {}", tmp.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn record(text: &str) -> ChunkRecord {
        ChunkRecord {
            text: text.to_string(),
            source: "a.txt".to_string(),
            category: "Unknown".to_string(),
        }
    }

    fn build_info() -> BuildInfo {
        BuildInfo {
            embedding_model: "hash".to_string(),
            embedding_mode: "hash".to_string(),
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }

    #[test]
    fn test_add_keeps_positions_aligned() {
        let mut builder = IndexBuilder::new();
        assert_eq!(builder.add(&[1.0, 0.0], record("a")).unwrap(), 0);
        assert_eq!(builder.add(&[0.0, 1.0], record("b")).unwrap(), 1);
        assert_eq!(builder.dimensions(), Some(2));

        // Rejected vectors do not leave an orphan record behind
        assert!(builder.add(&[1.0, 2.0, 3.0], record("c")).is_err());
        assert_eq!(builder.len(), 2);

        let (index, metadata) = builder.into_parts().unwrap();
        assert_eq!(index.len(), metadata.len());
        assert_eq!(metadata.get(1).unwrap().text, "b");
    }

    #[test]
    fn test_empty_builder_without_dimension() {
        assert!(matches!(
            IndexBuilder::new().into_parts(),
            Err(RagError::Configuration(_))
        ));
        let (index, metadata) = IndexBuilder::with_dimensions(4).into_parts().unwrap();
        assert!(index.is_empty() && metadata.is_empty());
    }

    #[test]
    fn test_known_dimension_rejects_first_mismatch() {
        let mut builder = IndexBuilder::with_dimensions(3);
        assert_eq!(builder.dimensions(), Some(3));
        assert!(builder.add(&[1.0, 0.0], record("short")).is_err());
        assert!(builder.is_empty());
        assert_eq!(builder.add(&[1.0, 0.0, 0.0], record("fits")).unwrap(), 0);
    }

    #[test]
    fn test_persist_writes_artifacts_and_no_tmp_files() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("embeddings");

        let mut builder = IndexBuilder::new();
        builder.add(&[1.0, 0.0, 0.5], record("alpha")).unwrap();
        builder.add(&[0.0, 1.0, 0.5], record("bravo")).unwrap();
        let persisted = builder.persist(&out, &build_info()).unwrap();

        assert!(persisted.index_path.exists());
        assert!(persisted.metadata_path.exists());
        assert_eq!(persisted.manifest.record_count, 2);
        assert_eq!(persisted.manifest.dimensions, 3);
        assert_eq!(IndexMeta::load(&persisted.manifest_path).unwrap(), persisted.manifest);

        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_rebuild_replaces_previous_artifacts() {
        let tmp = TempDir::new().unwrap();

        let mut first = IndexBuilder::new();
        for i in 0..3 {
            first.add(&[i as f32, 1.0], record("old")).unwrap();
        }
        first.persist(tmp.path(), &build_info()).unwrap();

        let mut second = IndexBuilder::new();
        second.add(&[1.0, 1.0], record("new")).unwrap();
        second.persist(tmp.path(), &build_info()).unwrap();

        let metadata = MetadataStore::load(&tmp.path().join(METADATA_FILE)).unwrap();
        let index = FlatIndex::load(&tmp.path().join(INDEX_FILE)).unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(index.len(), 1);
        assert_eq!(metadata.get(0).unwrap().text, "new");
    }

    #[test]
    fn test_failed_staging_leaves_previous_build() {
        let tmp = TempDir::new().unwrap();

        let mut first = IndexBuilder::new();
        first.add(&[1.0, 0.0], record("kept")).unwrap();
        first.persist(tmp.path(), &build_info()).unwrap();

        // A directory squatting on the staged metadata name makes its write fail
        std::fs::create_dir(tmp.path().join(format!("{}.tmp", METADATA_FILE))).unwrap();

        let mut second = IndexBuilder::new();
        second.add(&[0.0, 1.0], record("lost")).unwrap();
        let err = second.persist(tmp.path(), &build_info()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);

        let metadata = MetadataStore::load(&tmp.path().join(METADATA_FILE)).unwrap();
        assert_eq!(metadata.get(0).unwrap().text, "kept");
        assert!(!tmp.path().join(format!("{}.tmp", INDEX_FILE)).exists());
    }

    #[test]
    fn test_failed_first_rename_reports_removed_manifest() {
        let tmp = TempDir::new().unwrap();

        let mut first = IndexBuilder::new();
        first.add(&[1.0, 0.0], record("old")).unwrap();
        first.persist(tmp.path(), &build_info()).unwrap();

        // A non-empty directory at the index path cannot be renamed over
        let index_path = tmp.path().join(INDEX_FILE);
        std::fs::remove_file(&index_path).unwrap();
        std::fs::create_dir(&index_path).unwrap();
        std::fs::write(index_path.join("keep"), "x").unwrap();

        let mut second = IndexBuilder::new();
        second.add(&[0.0, 1.0], record("new")).unwrap();
        let err = second.persist(tmp.path(), &build_info()).unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
        let message = err.to_string();
        assert!(message.contains(MANIFEST_FILE), "{}", message);
        assert!(message.contains("already removed"), "{}", message);
        assert!(!tmp.path().join(MANIFEST_FILE).exists());
        assert!(!tmp.path().join(format!("{}.tmp", INDEX_FILE)).exists());
    }
}
