//! Indexing pipeline: PDF → chunks → embeddings → vector store.
//!
//! A paper is embedded in full before anything is written, so a failing
//! embedding backend never leaves a half-indexed paper behind. Batch
//! ingestion isolates failures per file: the error is logged, recorded in
//! the report, and the next file proceeds.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use syntopical_db::{Chunk, ChunkRepository};
use tracing::{debug, info, instrument, warn};

use crate::chunker::{chunk_text, ChunkerConfig};
use crate::embedding::Embedder;
use crate::models::PaperContent;
use crate::pdf_parser::process_pdf;

// ── Report types ──────────────────────────────────────────────────────────────

/// One successfully indexed paper.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPaper {
    pub title: String,
    pub source_file: PathBuf,
    pub chunk_ids: Vec<String>,
}

/// Outcome of a batch ingest.
#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub papers_found: usize,
    pub papers: Vec<IndexedPaper>,
    pub chunks_inserted: usize,
    /// `(file, message)` for every file that failed.
    pub errors: Vec<(PathBuf, String)>,
    pub duration_ms: u64,
}

impl IngestionReport {
    pub fn papers_indexed(&self) -> usize {
        self.papers.len()
    }
}

/// Progress notification emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum IngestionProgress {
    Started { path: PathBuf, index: usize, total: usize },
    Indexed { path: PathBuf, title: String, chunks: usize },
    Failed { path: PathBuf, error: String },
}

// ── Indexer ───────────────────────────────────────────────────────────────────

pub struct PaperIndexer {
    repo: ChunkRepository,
    embedder: Arc<dyn Embedder>,
    chunker: ChunkerConfig,
    batch_size: usize,
}

impl PaperIndexer {
    pub fn new(repo: ChunkRepository, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            repo,
            embedder,
            chunker: ChunkerConfig::default(),
            batch_size: 32,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Chunk, embed and store one paper, replacing whatever was stored under
    /// its title. Returns the ids of the new chunks. A paper without text is
    /// an error.
    #[instrument(skip(self, paper), fields(title = %paper.metadata.title))]
    pub async fn add_paper(&self, paper: &PaperContent) -> Result<Vec<String>> {
        let meta = &paper.metadata;
        let texts = chunk_text(&paper.text, &self.chunker);
        if texts.is_empty() {
            // Scanned or image-only PDF. Existing rows for the title stay.
            anyhow::bail!("no extractable text in \"{}\"", meta.title);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embedder.embed_batch(batch).await?);
        }
        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            );
        }

        let paper_hash = content_hash(&paper.text);
        if let Some(existing) = self.repo.find_by_title(&meta.title).await?.first() {
            if existing.paper_hash != paper_hash {
                warn!(
                    source_file = %meta.source_file.display(),
                    previous = %existing.source_file,
                    "A different paper with this title is already indexed; replacing it"
                );
            } else {
                debug!("Re-indexing unchanged paper");
            }
        }

        let now = chrono::Utc::now();
        let authors = meta.authors_joined();
        let source_file = meta.source_file.display().to_string();
        let chunks: Vec<Chunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| Chunk {
                id: Chunk::chunk_id(&meta.title, i),
                paper_hash: paper_hash.clone(),
                chunk_index: i as i64,
                content,
                title: meta.title.clone(),
                authors: authors.clone(),
                publication_date: meta.publication_date.clone(),
                source_file: source_file.clone(),
                abstract_text: meta.abstract_text.clone(),
                created_at: now,
                embedding,
            })
            .collect();

        self.repo
            .replace_paper(&meta.title, &chunks)
            .await
            .context("failed to store chunks")?;

        info!(chunks = chunks.len(), "Indexed paper");
        Ok(chunks.into_iter().map(|c| c.id).collect())
    }

    /// Extract and index a single PDF.
    pub async fn ingest_pdf(&self, path: &Path) -> Result<IndexedPaper> {
        let paper = process_pdf(path)?;
        let chunk_ids = self.add_paper(&paper).await?;
        Ok(IndexedPaper {
            title: paper.metadata.title,
            source_file: path.to_path_buf(),
            chunk_ids,
        })
    }

    /// Index every path in order; see [`PaperIndexer::ingest_paths_with_progress`].
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> IngestionReport {
        self.ingest_paths_with_progress(paths, |_| {}).await
    }

    /// Index every path in order, reporting progress to `on_progress`.
    /// Never fails as a whole; per-file errors land in the report.
    pub async fn ingest_paths_with_progress<F>(
        &self,
        paths: &[PathBuf],
        mut on_progress: F,
    ) -> IngestionReport
    where
        F: FnMut(&IngestionProgress),
    {
        let start = Instant::now();
        let mut report = IngestionReport {
            papers_found: paths.len(),
            ..Default::default()
        };

        for (index, path) in paths.iter().enumerate() {
            on_progress(&IngestionProgress::Started {
                path: path.clone(),
                index,
                total: paths.len(),
            });

            match self.ingest_pdf(path).await {
                Ok(paper) => {
                    report.chunks_inserted += paper.chunk_ids.len();
                    on_progress(&IngestionProgress::Indexed {
                        path: path.clone(),
                        title: paper.title.clone(),
                        chunks: paper.chunk_ids.len(),
                    });
                    report.papers.push(paper);
                }
                Err(e) => {
                    let msg = format!("{e:#}");
                    warn!(path = %path.display(), error = %msg, "Failed to ingest paper");
                    on_progress(&IngestionProgress::Failed {
                        path: path.clone(),
                        error: msg.clone(),
                    });
                    report.errors.push((path.clone(), msg));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            found = report.papers_found,
            indexed = report.papers_indexed(),
            chunks = report.chunks_inserted,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Ingestion complete"
        );
        report
    }
}

/// PDF files directly inside `dir`, sorted by name.
pub fn pdf_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Hex SHA-256 of a paper's full text.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}
