//! Ask command - answer questions from retrieved mission records

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;

use missionrag::config::Config;
use missionrag::format_context;
use missionrag::llm::{LlmProvider, LlmType};
use missionrag::Retriever;

use super::{out_dir, read_manifest, EmbeddingArgs};

#[derive(Args)]
pub struct AskArgs {
    /// Question to ask (omit for interactive mode)
    pub query: Option<String>,

    /// LLM provider (default from config)
    #[arg(long, value_parser = ["ollama", "openai", "simulated"])]
    pub llm: Option<String>,

    /// LLM model name (default from config)
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama host
    #[arg(long, env = "OLLAMA_HOST")]
    pub host: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,

    /// Interactive chat mode
    #[arg(short, long)]
    pub interactive: bool,

    /// Number of chunks to retrieve (default from config)
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Print the retrieved context before the answer
    #[arg(long)]
    pub show_context: bool,

    /// Directory holding the index artifacts
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,
}

struct Session {
    retriever: Retriever,
    llm: LlmProvider,
    top_k: usize,
    show_context: bool,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let out_dir = out_dir(args.out_dir.clone(), &config);

    let manifest = read_manifest(&out_dir);
    let embedder = args.embedding.provider(&config, manifest.as_ref())?;
    let retriever = Retriever::open(&out_dir, Arc::new(embedder))?;

    let provider = args.llm.clone().unwrap_or_else(|| config.llm.provider.clone());
    let model = args.model.clone().unwrap_or_else(|| config.llm.model.clone());
    let llm_type = LlmType::from_provider(
        &provider,
        args.host.clone().or_else(|| config.llm.host.clone()),
        args.api_base.clone().or_else(|| config.llm.base_url.clone()),
        args.api_key.clone().or_else(|| config.llm.api_key.clone()),
    )?;
    let llm = LlmProvider::new(model, llm_type)?;

    println!("Using {} with model {}", provider, llm.model_name());

    let session = Session {
        retriever,
        llm,
        top_k: args.top_k.unwrap_or(config.retrieval.top_k),
        show_context: args.show_context,
    };

    if args.interactive {
        run_interactive(&session).await
    } else {
        let query = args.query.ok_or_else(|| {
            anyhow::anyhow!("Query required in non-interactive mode. Use -i for interactive mode.")
        })?;

        let answer = ask_question(&query, &session).await?;
        println!("\nAnswer:\n{}", answer);
        Ok(())
    }
}

async fn ask_question(query: &str, session: &Session) -> anyhow::Result<String> {
    let hits = session.retriever.retrieve(query, session.top_k).await?;
    info!("Retrieved {} chunks", hits.len());

    let context = format_context(&hits);
    if session.show_context {
        println!("\nContext:\n{}\n", context);
    }

    session.llm.generate_response(query, &context).await
}

async fn run_interactive(session: &Session) -> anyhow::Result<()> {
    println!("\nInteractive mode. Type 'quit' or 'exit' to leave.\n");

    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        let _ = editor.add_history_entry(input);

        match ask_question(input, session).await {
            Ok(answer) => println!("\n{}\n", answer),
            Err(e) => eprintln!("\nError: {:#}\n", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}
