//! Config command - manage missionrag configuration

use clap::{Args, Subcommand};

use missionrag::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = Config::load();
            let path = Config::config_path();

            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", path.display());
            }
            println!();
            println!("[paths]");
            println!("data_dir = {:?}", config.paths.data_dir);
            println!("out_dir = {:?}", config.paths.out_dir);
            println!();
            println!("[build]");
            println!("chunk_size = {}", config.build.chunk_size);
            println!("chunk_overlap = {}", config.build.chunk_overlap);
            println!("batch_size = {}", config.build.batch_size);
            for rule in &config.build.categories {
                println!("# {:?} -> {:?}", rule.pattern, rule.label);
            }
            println!();
            println!("[retrieval]");
            println!("top_k = {}", config.retrieval.top_k);
            println!();
            println!("[embedding]");
            println!("provider = \"{}\"", config.embedding.provider);
            println!("model = \"{}\"", config.embedding.model);
            if let Some(host) = &config.embedding.host {
                println!("host = \"{}\"", host);
            }
            if let Some(base_url) = &config.embedding.base_url {
                println!("base_url = \"{}\"", base_url);
            }
            if config.embedding.api_key.is_some() {
                println!("api_key = \"***\"");
            }
            println!();
            println!("[llm]");
            println!("provider = \"{}\"", config.llm.provider);
            println!("model = \"{}\"", config.llm.model);
            if let Some(host) = &config.llm.host {
                println!("host = \"{}\"", host);
            }
            if config.llm.api_key.is_some() {
                println!("api_key = \"***\"");
            }

            if let Err(e) = config.validate() {
                println!();
                println!("warning: {}", e);
            }
        }

        ConfigCommands::Init { force } => {
            let path = Config::config_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }

            Config::default().save()?;
            println!("Created config file at {}", path.display());
            println!();
            println!("Common embedding configurations:");
            println!();
            println!("  # Ollama (local)");
            println!("  provider = \"ollama\"");
            println!("  model = \"all-minilm\"");
            println!();
            println!("  # OpenAI");
            println!("  provider = \"openai\"");
            println!("  model = \"text-embedding-3-small\"");
            println!("  # api_key = \"sk-...\"  # or set OPENAI_API_KEY env var");
            println!();
            println!("  # Offline, no model download");
            println!("  provider = \"hash\"");
        }

        ConfigCommands::Path => {
            println!("{}", Config::config_path().display());
        }
    }

    Ok(())
}
