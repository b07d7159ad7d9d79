//! Retriever - load a persisted index and answer top-k queries

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::embedding::{get_model_config, Embedder};
use crate::error::{RagError, Result};

use super::flat::{FlatIndex, INDEX_FILE};
use super::meta::{IndexMeta, MANIFEST_FILE};
use super::metadata::{ChunkRecord, MetadataStore, METADATA_FILE};

/// One ranked match
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub record: ChunkRecord,
    /// Raw inner product between query and chunk vectors
    pub score: f32,
    /// Position of the chunk in the index
    pub position: usize,
}

impl RetrievalHit {
    pub fn text(&self) -> &str {
        &self.record.text
    }
}

#[derive(Debug)]
struct LoadedIndex {
    index: FlatIndex,
    metadata: MetadataStore,
    manifest: Option<IndexMeta>,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready(LoadedIndex),
}

/// Answers queries against one immutable index
///
/// Starts uninitialized; [`Retriever::load`] moves it to ready. Queries only
/// read shared state, so one instance can serve concurrent callers behind an
/// `Arc`.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    state: State,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.model_name())
            .field("state", &self.state)
            .finish()
    }
}

impl Retriever {
    /// Create a retriever with no index loaded
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: State::Uninitialized,
        }
    }

    /// Create a retriever and load the index in `out_dir`
    pub fn open(out_dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let mut retriever = Self::new(embedder);
        retriever.load(out_dir)?;
        Ok(retriever)
    }

    /// Create a ready retriever over an in-memory index
    pub fn from_parts(
        index: FlatIndex,
        metadata: MetadataStore,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let loaded = LoadedIndex {
            index,
            metadata,
            manifest: None,
        };
        check_loaded(&loaded, embedder.as_ref())?;
        Ok(Self {
            embedder,
            state: State::Ready(loaded),
        })
    }

    /// Load the persisted index and metadata from `out_dir`
    ///
    /// On failure the retriever keeps its previous state.
    pub fn load(&mut self, out_dir: &Path) -> Result<()> {
        info!("Loading index from {:?}", out_dir);

        let index = FlatIndex::load(&out_dir.join(INDEX_FILE))?;
        let metadata = MetadataStore::load(&out_dir.join(METADATA_FILE))?;

        let manifest_path = out_dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            Some(IndexMeta::load(&manifest_path)?)
        } else {
            warn!("No manifest at {:?}; relying on artifact headers", manifest_path);
            None
        };

        let loaded = LoadedIndex {
            index,
            metadata,
            manifest,
        };
        check_loaded(&loaded, self.embedder.as_ref())?;

        info!(
            "Loaded {} vectors ({} dims)",
            loaded.index.len(),
            loaded.index.dimensions()
        );

        self.state = State::Ready(loaded);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Number of indexed chunks
    pub fn len(&self) -> Result<usize> {
        Ok(self.ready()?.index.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Manifest of the loaded index, if one was present
    pub fn manifest(&self) -> Result<Option<&IndexMeta>> {
        Ok(self.ready()?.manifest.as_ref())
    }

    /// Embed `query` and return up to `k` matches, best first
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        if k < 1 {
            return Err(RagError::Configuration(format!(
                "k must be at least 1, got {}",
                k
            )));
        }
        let loaded = self.ready()?;

        let query_vector = self.embedder.embed_one(query).await?;
        let matches = loaded.index.search(&query_vector, k)?;

        debug!("Query matched {} of {} chunks", matches.len(), loaded.index.len());

        matches
            .into_iter()
            .map(|(position, score)| {
                let record = loaded.metadata.get(position).cloned().ok_or_else(|| {
                    RagError::Consistency(format!(
                        "index position {} has no metadata record",
                        position
                    ))
                })?;
                Ok(RetrievalHit {
                    record,
                    score,
                    position,
                })
            })
            .collect()
    }

    /// Like [`Retriever::retrieve`], returning `(text, record)` pairs
    pub async fn retrieve_texts(&self, query: &str, k: usize) -> Result<Vec<(String, ChunkRecord)>> {
        Ok(self
            .retrieve(query, k)
            .await?
            .into_iter()
            .map(|hit| (hit.record.text.clone(), hit.record))
            .collect())
    }

    fn ready(&self) -> Result<&LoadedIndex> {
        match &self.state {
            State::Ready(loaded) => Ok(loaded),
            State::Uninitialized => Err(RagError::NotReady),
        }
    }
}

/// Reject an index whose parts disagree with each other or with the embedder
fn check_loaded(loaded: &LoadedIndex, embedder: &dyn Embedder) -> Result<()> {
    let vectors = loaded.index.len();
    let records = loaded.metadata.len();
    let dims = loaded.index.dimensions();

    if vectors != records {
        return Err(RagError::Consistency(format!(
            "index holds {} vectors but metadata holds {} records",
            vectors, records
        )));
    }

    if let Some(manifest) = &loaded.manifest {
        if manifest.record_count != vectors || manifest.dimensions != dims {
            return Err(RagError::Consistency(format!(
                "manifest describes {} x {} but artifacts hold {} x {}",
                manifest.record_count, manifest.dimensions, vectors, dims
            )));
        }
        if let Some(expected) = registry_dimension_conflict(&manifest.embedding_model, dims) {
            warn!(
                "Model {} is registered with {} dimensions but the index holds {}",
                manifest.embedding_model, expected, dims
            );
        }
        if manifest.embedding_model != embedder.model_name() {
            warn!(
                "Index was built with model {} but queries use {}",
                manifest.embedding_model,
                embedder.model_name()
            );
        }
    }

    if let Some(embedder_dims) = embedder.dimensions() {
        if embedder_dims != dims {
            return Err(RagError::Consistency(format!(
                "embedder produces {} dimensions but the index holds {}",
                embedder_dims, dims
            )));
        }
    }

    Ok(())
}

/// Registered dimension of `model` when it differs from `dims`
fn registry_dimension_conflict(model: &str, dims: usize) -> Option<usize> {
    get_model_config(model)
        .map(|config| config.dimensions)
        .filter(|&expected| expected != dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::error::ErrorKind;
    use crate::index::IndexBuilder;

    /// Embeds text as (length, vowel count, 1)
    struct ShapeEmbedder;

    #[async_trait]
    impl Embedder for ShapeEmbedder {
        fn model_name(&self) -> &str {
            "shape"
        }

        fn dimensions(&self) -> Option<usize> {
            Some(3)
        }

        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                    vec![t.len() as f32, vowels as f32, 1.0]
                })
                .collect())
        }
    }

    fn record(text: &str) -> ChunkRecord {
        ChunkRecord {
            text: text.to_string(),
            source: "a.txt".to_string(),
            category: "Unknown".to_string(),
        }
    }

    async fn ready_retriever(texts: &[&str]) -> Retriever {
        let embedder: Arc<dyn Embedder> = Arc::new(ShapeEmbedder);
        let vectors = embedder.embed(texts).await.unwrap();
        let mut builder = IndexBuilder::new();
        for (text, vector) in texts.iter().zip(&vectors) {
            builder.add(vector, record(text)).unwrap();
        }
        let (index, metadata) = builder.into_parts().unwrap();
        Retriever::from_parts(index, metadata, embedder).unwrap()
    }

    #[tokio::test]
    async fn test_uninitialized_fails_explicitly() {
        let retriever = Retriever::new(Arc::new(ShapeEmbedder));
        assert!(!retriever.is_ready());
        let err = retriever.retrieve("anything", 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert!(retriever.len().is_err());
    }

    #[tokio::test]
    async fn test_k_zero_rejected() {
        let retriever = ready_retriever(&["abc"]).await;
        let err = retriever.retrieve("abc", 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_results_best_first_with_records() {
        let retriever = ready_retriever(&["xy", "xxxxxxxx", "xxxx"]).await;
        let hits = retriever.retrieve("z", 3).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text()).collect();
        assert_eq!(texts, vec!["xxxxxxxx", "xxxx", "xy"]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(hits[0].position, 1);
    }

    #[tokio::test]
    async fn test_k_beyond_corpus_returns_all() {
        let retriever = ready_retriever(&["a", "bb", "ccc"]).await;
        assert_eq!(retriever.retrieve("q", 50).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_mismatched_lengths_rejected() {
        let mut index = FlatIndex::new(3);
        index.add(&[1.0, 0.0, 1.0]).unwrap();
        index.add(&[2.0, 0.0, 1.0]).unwrap();
        let mut metadata = MetadataStore::new();
        metadata.push(record("only one"));

        let err = Retriever::from_parts(index, metadata, Arc::new(ShapeEmbedder)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[tokio::test]
    async fn test_embedder_dimension_mismatch_rejected() {
        let mut index = FlatIndex::new(2);
        index.add(&[1.0, 0.0]).unwrap();
        let mut metadata = MetadataStore::new();
        metadata.push(record("two dims"));

        let err = Retriever::from_parts(index, metadata, Arc::new(ShapeEmbedder)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[tokio::test]
    async fn test_in_memory_index_has_no_manifest() {
        let retriever = ready_retriever(&["abc"]).await;
        assert!(retriever.manifest().unwrap().is_none());
        assert_eq!(
            Retriever::new(Arc::new(ShapeEmbedder)).manifest().unwrap_err().kind(),
            ErrorKind::NotReady
        );
    }

    #[test]
    fn test_registry_dimension_conflict() {
        assert_eq!(registry_dimension_conflict("all-minilm:latest", 384), None);
        assert_eq!(registry_dimension_conflict("all-minilm:latest", 768), Some(384));
        assert_eq!(registry_dimension_conflict("hash", 256), None);
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let retriever = Arc::new(ready_retriever(&["aaa", "bbbbbb", "c"]).await);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let retriever = Arc::clone(&retriever);
            handles.push(tokio::spawn(async move {
                retriever.retrieve("query", 2).await.unwrap()
            }));
        }
        let first = handles.remove(0).await.unwrap();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), first);
        }
    }
}
