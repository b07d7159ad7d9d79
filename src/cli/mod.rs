//! CLI module - command definitions and handlers

mod ask;
mod build;
mod config_cmd;
mod search;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use missionrag::config::Config;
use missionrag::embedding::{EmbeddingMode, EmbeddingProvider};
use missionrag::index::{IndexMeta, MANIFEST_FILE};

pub use ask::AskArgs;
pub use build::BuildArgs;
pub use config_cmd::ConfigArgs;
pub use search::SearchArgs;

/// missionrag - semantic search over mission transcripts
#[derive(Parser)]
#[command(name = "missionrag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the index from a directory of text files
    Build(BuildArgs),

    /// Retrieve the chunks closest to a query
    Search(SearchArgs),

    /// Answer a question from retrieved context
    Ask(AskArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Build(args) => build::run(args, self.quiet).await,
            Commands::Search(args) => search::run(args).await,
            Commands::Ask(args) => ask::run(args).await,
            Commands::Config(args) => config_cmd::run(args),
        }
    }
}

/// Embedding flags shared by every command that embeds text
#[derive(Args, Clone)]
pub struct EmbeddingArgs {
    /// Embedding provider (ollama, openai, local, hash)
    #[arg(long)]
    pub embedding_provider: Option<String>,

    /// Embedding model name
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Ollama host for embeddings
    #[arg(long, env = "OLLAMA_HOST")]
    pub embedding_host: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub embedding_api_base: Option<String>,

    /// API key for embedding service (OpenAI)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,
}

impl EmbeddingArgs {
    /// Create the provider, preferring flags, then `fallback`, then config
    ///
    /// `fallback` carries the provider and model recorded in an index
    /// manifest so queries land in the same embedding space as the index.
    pub fn provider(
        &self,
        config: &Config,
        fallback: Option<&IndexMeta>,
    ) -> anyhow::Result<EmbeddingProvider> {
        let provider = self
            .embedding_provider
            .clone()
            .or_else(|| fallback.map(|m| m.embedding_mode.clone()))
            .unwrap_or_else(|| config.embedding.provider.clone());
        let model = self
            .embedding_model
            .clone()
            .or_else(|| fallback.map(|m| m.embedding_model.clone()))
            .unwrap_or_else(|| config.embedding.model.clone());

        let mode = EmbeddingMode::from_provider(
            &provider,
            self.embedding_host.clone().or_else(|| config.embedding.host.clone()),
            self.embedding_api_base
                .clone()
                .or_else(|| config.embedding.base_url.clone()),
            self.embedding_api_key
                .clone()
                .or_else(|| config.embedding.api_key.clone()),
        )?;

        Ok(EmbeddingProvider::new(model, mode)?)
    }
}

/// Manifest of the index in `out_dir`, if one exists
pub fn read_manifest(out_dir: &Path) -> Option<IndexMeta> {
    let path = out_dir.join(MANIFEST_FILE);
    match IndexMeta::load(&path) {
        Ok(meta) => {
            info!(
                "Index built with {} via {} ({} records, {} dims)",
                meta.embedding_model, meta.embedding_mode, meta.record_count, meta.dimensions
            );
            Some(meta)
        }
        Err(_) => None,
    }
}

/// Resolve the artifact directory from a flag or the config
pub fn out_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.unwrap_or_else(|| config.paths.out_dir.clone())
}
