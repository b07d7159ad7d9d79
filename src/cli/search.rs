//! Search command - query an index

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use missionrag::config::Config;
use missionrag::Retriever;

use super::{out_dir, read_manifest, EmbeddingArgs};

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Number of results to return (default from config)
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Directory holding the index artifacts
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,
}

pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let out_dir = out_dir(args.out_dir, &config);
    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);

    let manifest = read_manifest(&out_dir);
    let embedder = args.embedding.provider(&config, manifest.as_ref())?;
    let retriever = Retriever::open(&out_dir, Arc::new(embedder))?;

    let results = retriever.retrieve(&args.query, top_k).await?;

    if args.format == "json" {
        let json_results: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "position": r.position,
                    "score": r.score,
                    "text": r.record.text,
                    "source": r.record.source,
                    "mission": r.record.category,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    } else {
        println!("\nSearch results for '{}' (top {}):", args.query, results.len());
        match retriever.manifest()? {
            Some(meta) => println!(
                "Index: {} chunks embedded with {} via {}\n",
                meta.record_count, meta.embedding_model, meta.embedding_mode
            ),
            None => println!("Index: {} chunks (no manifest)\n", retriever.len()?),
        }

        for (i, result) in results.iter().enumerate() {
            println!("{}. Score: {:.4}", i + 1, result.score);
            println!(
                "   Source: {} | Mission: {}",
                result.record.source, result.record.category
            );
            println!("   {}", preview(result.text(), 200));
            println!();
        }
    }

    Ok(())
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
