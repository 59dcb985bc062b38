mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use noesis::app::AppState;
use noesis::config::NoesisConfig;
use noesis::memory::MemoryType;

#[derive(Parser)]
#[command(name = "noesis", version, about = "Local cognitive layer: memory, learning, file search")]
struct Cli {
    /// Path to config.toml (defaults to ~/.noesis/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question; answers from memory, optionally AI-enhanced
    Think { input: String },
    /// Store a memory
    Remember {
        content: String,
        /// semantic, episodic, procedural, working, meta, causal, goal, emotional
        #[arg(long, default_value = "semantic")]
        r#type: String,
        #[arg(long, default_value_t = 0.5)]
        importance: f64,
    },
    /// Search stored memories
    Recall {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Restrict results to one memory type
        #[arg(long)]
        r#type: Option<String>,
    },
    /// Semantic search over indexed files
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Scan and index the configured folders
    Index,
    /// Show engine, learner, and index statistics
    Stats,
    /// Show recent thoughts
    Thoughts {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run a learner evolution pass
    Evolve,
    /// Run as a daemon (cycle timer + folder watcher)
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NoesisConfig::load_from(path)?,
        None => NoesisConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let state = Arc::new(AppState::init(config).await?);

    match cli.command {
        Command::Think { input } => {
            cli::interact::think(&state, &input).await?;
            state.flush()?;
        }
        Command::Remember {
            content,
            r#type,
            importance,
        } => {
            let memory_type: MemoryType = r#type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            cli::interact::remember(&state, &content, memory_type, importance).await?;
        }
        Command::Recall { query, limit, r#type } => {
            let type_filter = r#type
                .map(|t| t.parse::<MemoryType>())
                .transpose()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            cli::interact::recall(&state, &query, limit, type_filter).await?;
        }
        Command::Search { query, limit } => {
            cli::files::search(&state, &query, limit).await?;
        }
        Command::Index => {
            cli::files::index(&state).await?;
        }
        Command::Stats => {
            cli::stats::stats(&state)?;
        }
        Command::Thoughts { limit } => {
            cli::stats::thoughts(&state, limit)?;
        }
        Command::Evolve => {
            cli::stats::evolve(&state).await?;
        }
        Command::Run => {
            cli::run::run(state).await?;
        }
    }

    Ok(())
}
