//! Indexing pipeline: load, chunk, embed, build, persist

use tracing::info;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::index::{BuildInfo, ChunkRecord, IndexBuilder, PersistedIndex};
use crate::loader::{load_documents, SkippedFile};

/// Outcome of a successful build
#[derive(Debug)]
pub struct BuildSummary {
    pub persisted: PersistedIndex,
    pub files_loaded: usize,
    pub chunk_count: usize,
    pub dimensions: usize,
    /// Files found but not indexed
    pub warnings: Vec<SkippedFile>,
}

/// Rebuild the index in `config.paths.out_dir` from `config.paths.data_dir`
///
/// `on_progress(done, total)` is called after each embedding batch.
pub async fn build_index(
    config: &Config,
    embedder: &dyn Embedder,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<BuildSummary> {
    config.validate()?;
    let chunker = config.chunker()?;

    let report = load_documents(&config.paths.data_dir, &chunker, &config.build.categories)?;
    if report.chunks.is_empty() {
        return Err(RagError::Configuration(format!(
            "no text found to index in {}",
            config.paths.data_dir.display()
        )));
    }

    let total = report.chunks.len();
    info!(
        "Embedding {} chunks with {} in batches of {}",
        total,
        embedder.model_name(),
        config.build.batch_size
    );

    let mut builder = match embedder.dimensions() {
        Some(dims) => IndexBuilder::with_dimensions(dims),
        None => IndexBuilder::new(),
    };
    let mut done = 0;

    for batch in report.chunks.chunks(config.build.batch_size) {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(RagError::Model(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }

        for (chunk, vector) in batch.iter().zip(&vectors) {
            builder.add(vector, ChunkRecord::from(chunk.clone()))?;
        }

        done += batch.len();
        on_progress(done, total);
    }

    let dimensions = builder.dimensions().unwrap_or(0);
    let build = BuildInfo {
        embedding_model: embedder.model_name().to_string(),
        embedding_mode: embedder.provider_name().to_string(),
        chunk_size: chunker.chunk_size(),
        chunk_overlap: chunker.chunk_overlap(),
    };
    let persisted = builder.persist(&config.paths.out_dir, &build)?;

    Ok(BuildSummary {
        persisted,
        files_loaded: report.files_loaded,
        chunk_count: total,
        dimensions,
        warnings: report.skipped,
    })
}
