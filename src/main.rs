mod cli;
mod config;
mod embedding;
mod memory;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memdex", version, about = "File-backed knowledge index with hybrid search")]
struct Cli {
    /// Config file (defaults to ~/.memdex/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Search the index
    Search {
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum score a result must reach
        #[arg(long)]
        min_score: Option<f64>,
        /// Relation hops to expand per result
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Append a new memory
    Add {
        content: String,
        /// learning, decision, interaction, event, or insight
        #[arg(long = "type", default_value = "learning")]
        memory_type: String,
        /// 1-10
        #[arg(long, default_value_t = 5)]
        importance: u8,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Source document, relative to the memory root
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        line: Option<u32>,
        #[arg(long)]
        context: Option<String>,
    },
    /// Link two memories (the inverse edge is added automatically)
    Link {
        source: String,
        target: String,
        /// caused, caused_by, related, supersedes, contradicts, or elaborates
        #[arg(long, default_value = "related")]
        relation: String,
    },
    /// Generate missing embeddings and auto-link similar memories
    Embed {
        /// Re-embed memories that already have a vector
        #[arg(long)]
        force: bool,
    },
    /// Convert legacy embeddings to the compact encoding
    Migrate,
    /// Show index statistics
    Stats,
    /// Show one memory with its relations
    Inspect { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::MemdexConfig::load_from(path)?,
        None => config::MemdexConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::Search {
            query,
            limit,
            min_score,
            depth,
        } => cli::search::search(&config, &query, limit, min_score, depth).await?,
        Command::Add {
            content,
            memory_type,
            importance,
            tags,
            file,
            line,
            context,
        } => {
            let args = cli::add::AddArgs {
                content,
                memory_type,
                importance,
                tags,
                file,
                line,
                context,
            };
            cli::add::add(&config, args).await?
        }
        Command::Link {
            source,
            target,
            relation,
        } => cli::link::link(&config, &source, &target, &relation)?,
        Command::Embed { force } => cli::embed::embed(&config, force).await?,
        Command::Migrate => cli::migrate::migrate(&config)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Inspect { id } => cli::inspect::inspect(&config, &id)?,
    }

    Ok(())
}
