//! syntopical: ask questions across a shelf of academic papers.
//! Entry point for the `syntopical` binary.

mod commands;
mod config;
mod display;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "syntopical", version, about = "Syntopical reading over your PDF library")]
struct Cli {
    /// LanceDB directory (overrides DB_PATH and the config file)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Chat model (overrides the config file)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index PDF files, or every PDF in the given directories
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List indexed papers
    List,
    /// Interactive question answering across the indexed papers
    Chat {
        /// Only consult the paper with this exact title
        #[arg(long)]
        paper: Option<String>,
    },
    /// One-shot structured analysis of a topic
    Analyze {
        topic: String,
        /// Only consult the paper with this exact title
        #[arg(long)]
        paper: Option<String>,
    },
    /// Guided setup: index a folder or an arXiv search, then chat
    Start,
    /// Search arXiv, download the hits and index them
    Fetch {
        query: String,
        #[arg(long, default_value_t = 5)]
        max_results: usize,
    },
    /// Remove a paper from the index
    Delete { title: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("syntopical=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = config::Config::load()?;
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    info!(
        db = %config.database.path.display(),
        llm = config.llm.kind.as_str(),
        model = %config.llm.model,
        "Configuration loaded"
    );

    commands::run(cli.command, &config).await
}
