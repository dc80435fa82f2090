//! Subcommand implementations.
//!
//! Per-item failures (one bad PDF, one failed download, one failed answer)
//! are printed and skipped. Only a store that cannot be opened or a broken
//! config makes the process exit non-zero.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syntopical_chat::{ChatError, SyntopicalChat, VectorRetriever};
use syntopical_db::{ChunkRepository, Database};
use syntopical_ingestion::{
    pdf_files_in, ArxivClient, Embedder, EmbeddingClient, IngestionProgress, IngestionReport,
    PaperIndexer,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::display;
use crate::Command;

const CHAT_SOURCES_SHOWN: usize = 3;
const ANALYSIS_SOURCES_SHOWN: usize = 5;

pub async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Upload { paths } => upload(config, &paths).await,
        Command::List => list(config).await,
        Command::Chat { paper } => chat(config, paper.as_deref()).await,
        Command::Analyze { topic, paper } => analyze(config, &topic, paper.as_deref()).await,
        Command::Start => start(config).await,
        Command::Fetch { query, max_results } => fetch(config, &query, max_results).await,
        Command::Delete { title } => delete(config, &title).await,
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

/// Store and embedder shared by every command that touches the index.
struct Library {
    repo: ChunkRepository,
    embedder: Arc<dyn Embedder>,
}

impl Library {
    async fn open(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database.path)
            .await
            .with_context(|| format!("cannot open store at {}", config.database.path.display()))?;
        db.initialize(config.embedding.dim)
            .await
            .context("cannot initialize chunk table")?;

        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingClient::new(config.embedding.clone())?);
        Ok(Self {
            repo: ChunkRepository::new(Arc::new(db)),
            embedder,
        })
    }

    fn indexer(&self, config: &Config) -> PaperIndexer {
        PaperIndexer::new(self.repo.clone(), self.embedder.clone())
            .with_batch_size(config.embedding.batch_size.max(1))
    }

    /// `None` after telling the user the chat backend has no credential.
    fn session(&self, config: &Config, paper: Option<&str>) -> Result<Option<SyntopicalChat>> {
        let mut retriever = VectorRetriever::new(self.repo.clone(), self.embedder.clone());
        if let Some(title) = paper {
            retriever = retriever.within_paper(title);
        }
        let retriever = Arc::new(retriever);
        match SyntopicalChat::connect(&config.backend_config(), retriever, config.chat_config()) {
            Ok(session) => Ok(Some(session)),
            Err(ChatError::MissingCredential(msg)) => {
                missing_credential(&msg);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn missing_credential(msg: &str) {
    println!(
        "{} {msg}. Add it to your environment or a .env file to chat with your papers.",
        style("Chat is unavailable:").yellow().bold()
    );
}

/// Checked before any slow work so `start` does not index a folder only to
/// refuse to chat afterwards.
fn credentials_ready(config: &Config) -> bool {
    match config.backend_config().check_credentials() {
        Ok(()) => true,
        Err(e) => {
            missing_credential(&e.to_string());
            false
        }
    }
}

/// Files as given, directories expanded to the PDFs directly inside them.
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            match pdf_files_in(path) {
                Ok(found) => files.extend(found),
                Err(e) => display::error(format!("{e:#}")),
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

async fn ingest(indexer: &PaperIndexer, paths: &[PathBuf]) -> IngestionReport {
    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let report = indexer
        .ingest_paths_with_progress(paths, |event| match event {
            IngestionProgress::Started { path, .. } => bar.set_message(file_label(path)),
            IngestionProgress::Indexed { title, chunks, .. } => {
                bar.println(format!("{} {title} ({chunks} chunks)", style("✓").green()));
                bar.inc(1);
            }
            IngestionProgress::Failed { path, error } => {
                bar.println(format!("{} {}: {error}", style("✗").red(), path.display()));
                bar.inc(1);
            }
        })
        .await;

    bar.finish_and_clear();
    display::ingestion_summary(&report);
    report
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn upload(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let files = expand_paths(paths);
    if files.is_empty() {
        println!("{}", style("No PDF files to index.").yellow());
        return Ok(());
    }
    let library = Library::open(config).await?;
    ingest(&library.indexer(config), &files).await;
    Ok(())
}

async fn list(config: &Config) -> Result<()> {
    let library = Library::open(config).await?;
    let papers = library.repo.list_papers().await?;
    let stats = library.repo.database().stats().await?;
    display::paper_table(&papers, &stats);
    Ok(())
}

async fn delete(config: &Config, title: &str) -> Result<()> {
    let library = Library::open(config).await?;
    let removed = library.repo.delete_by_title(title).await?;
    if removed == 0 {
        println!("{}", style(format!("No paper titled \"{title}\" in the index.")).yellow());
    } else {
        println!("Deleted \"{title}\" ({removed} chunks)");
    }
    Ok(())
}

async fn analyze(config: &Config, topic: &str, paper: Option<&str>) -> Result<()> {
    if !credentials_ready(config) {
        return Ok(());
    }
    let library = Library::open(config).await?;
    if !paper_exists(&library, paper).await? {
        return Ok(());
    }
    let Some(mut session) = library.session(config, paper)? else {
        return Ok(());
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Analyzing \"{topic}\" across your papers..."));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    let result = session.analyze_topic(topic).await;
    spinner.finish_and_clear();

    match result {
        Ok(resp) => {
            display::answer(&resp.answer);
            display::sources(&resp.source_documents, ANALYSIS_SOURCES_SHOWN);
        }
        Err(e) => display::error(e),
    }
    Ok(())
}

async fn chat(config: &Config, paper: Option<&str>) -> Result<()> {
    if !credentials_ready(config) {
        return Ok(());
    }
    let library = Library::open(config).await?;
    if !paper_exists(&library, paper).await? {
        return Ok(());
    }
    chat_loop(&library, config, paper).await
}

/// A `--paper` title that matches nothing would make every answer sourceless.
async fn paper_exists(library: &Library, paper: Option<&str>) -> Result<bool> {
    let Some(title) = paper else {
        return Ok(true);
    };
    if library.repo.find_by_title(title).await?.is_empty() {
        println!(
            "{}",
            style(format!("No paper titled \"{title}\" in the index. See `syntopical list`.")).yellow()
        );
        return Ok(false);
    }
    Ok(true)
}

async fn fetch(config: &Config, query: &str, max_results: usize) -> Result<()> {
    let library = Library::open(config).await?;
    fetch_and_index(&library, config, query, max_results).await;
    Ok(())
}

async fn start(config: &Config) -> Result<()> {
    if !credentials_ready(config) {
        return Ok(());
    }
    let library = Library::open(config).await?;
    let theme = ColorfulTheme::default();

    println!("{}", style("Welcome to syntopical.").bold());
    let choice = Select::with_theme(&theme)
        .with_prompt("Where are your papers?")
        .items(&["A folder of PDFs", "Search arXiv"])
        .default(0)
        .interact()?;

    if choice == 0 {
        let folder: String = Input::with_theme(&theme)
            .with_prompt("Folder")
            .default(config.paths.pdf_dir.display().to_string())
            .interact_text()?;
        match pdf_files_in(Path::new(&folder)) {
            Ok(files) if files.is_empty() => {
                println!("{}", style(format!("No PDF files in {folder}.")).yellow())
            }
            Ok(files) => {
                ingest(&library.indexer(config), &files).await;
            }
            Err(e) => display::error(format!("{e:#}")),
        }
    } else {
        let query: String = Input::with_theme(&theme)
            .with_prompt("Search arXiv for")
            .interact_text()?;
        let max_results: usize = Input::with_theme(&theme)
            .with_prompt("How many papers")
            .default(5)
            .interact_text()?;
        fetch_and_index(&library, config, &query, max_results).await;
    }

    chat_loop(&library, config, None).await
}

// ── Shared flows ──────────────────────────────────────────────────────────────

async fn fetch_and_index(library: &Library, config: &Config, query: &str, max_results: usize) {
    let client = match ArxivClient::new(&config.paths.arxiv_dir) {
        Ok(c) => c,
        Err(e) => {
            display::error(format!("{e:#}"));
            return;
        }
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Searching arXiv for \"{query}\"..."));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    let result = client.search_and_download(query, max_results).await;
    spinner.finish_and_clear();

    let downloaded = match result {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "arXiv search failed");
            display::error(format!("arXiv search failed: {e:#}"));
            return;
        }
    };
    if downloaded.is_empty() {
        println!("{}", style("No papers downloaded.").yellow());
        return;
    }
    for (paper, path) in &downloaded {
        debug!(arxiv_id = %paper.arxiv_id, path = %path.display(), "Downloaded");
        println!("{} {} [{}]", style("↓").blue(), paper.title, paper.arxiv_id);
    }

    let files: Vec<PathBuf> = downloaded.into_iter().map(|(_, path)| path).collect();
    ingest(&library.indexer(config), &files).await;
}

async fn chat_loop(library: &Library, config: &Config, paper: Option<&str>) -> Result<()> {
    let Some(mut session) = library.session(config, paper)? else {
        return Ok(());
    };

    println!(
        "{}",
        style("Ask anything about your papers. `reset` clears the conversation, `exit` quits.").dim()
    );

    loop {
        let line: String = Input::new()
            .with_prompt(style("You").green().bold().to_string())
            .allow_empty(true)
            .interact_text()?;
        let query = line.trim();

        match query.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => break,
            "reset" => {
                session.reset_conversation();
                println!("{}", style("Conversation cleared.").dim());
                continue;
            }
            _ => {}
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_message("Reading across papers...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(120));
        let result = session.chat(query).await;
        spinner.finish_and_clear();

        match result {
            Ok(resp) => {
                display::answer(&resp.answer);
                display::sources(&resp.source_documents, CHAT_SOURCES_SHOWN);
                println!();
            }
            Err(e) => display::error(e),
        }
    }

    println!("Goodbye.");
    Ok(())
}
