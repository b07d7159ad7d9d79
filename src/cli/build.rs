//! Build command - index construction from documents

use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use missionrag::config::Config;
use missionrag::pipeline::build_index;

use super::EmbeddingArgs;

#[derive(Args)]
pub struct BuildArgs {
    /// Directory of .txt documents (default from config: data)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory for the index artifacts (default from config: embeddings)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Chunk overlap in characters
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Texts per embedding request
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,
}

pub async fn run(args: BuildArgs, quiet: bool) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(dir) = args.data_dir {
        config.paths.data_dir = dir;
    }
    if let Some(dir) = args.out_dir {
        config.paths.out_dir = dir;
    }
    if let Some(size) = args.chunk_size {
        config.build.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.build.chunk_overlap = overlap;
    }
    if let Some(batch) = args.batch_size {
        config.build.batch_size = batch;
    }
    config.validate()?;

    info!(
        "Building index from {:?} into {:?}",
        config.paths.data_dir, config.paths.out_dir
    );

    let embedder = args.embedding.provider(&config, None)?;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks embedded ({eta})")?
            .progress_chars("#>-"),
    );

    let summary = build_index(&config, &embedder, |done, total| {
        progress.set_length(total as u64);
        progress.set_position(done as u64);
    })
    .await?;

    progress.finish_and_clear();

    println!("Index built at {:?}", config.paths.out_dir);
    println!("  Files: {}", summary.files_loaded);
    println!("  Chunks: {}", summary.chunk_count);
    println!("  Dimensions: {}", summary.dimensions);

    if !summary.warnings.is_empty() {
        println!("  Skipped {} file(s):", summary.warnings.len());
        for skipped in &summary.warnings {
            println!("    {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    Ok(())
}
