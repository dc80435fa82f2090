//! Chunk retrieval for the chat loop.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use syntopical_db::{ChunkRepository, ScoredChunk};
use syntopical_ingestion::Embedder;
use tracing::{debug, instrument};

use crate::error::{ChatError, Result};

pub const DEFAULT_TOP_K: usize = 5;

/// A retrieved passage and the paper it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDocument {
    pub content: String,
    pub title: String,
    pub authors: String,
    pub publication_date: Option<String>,
    pub source_file: String,
    pub chunk_id: String,
    pub distance: Option<f32>,
}

impl From<ScoredChunk> for SourceDocument {
    fn from(scored: ScoredChunk) -> Self {
        let chunk = scored.chunk;
        Self {
            content: chunk.content,
            title: chunk.title,
            authors: chunk.authors,
            publication_date: chunk.publication_date,
            source_file: chunk.source_file,
            chunk_id: chunk.id,
            distance: scored.distance,
        }
    }
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `k` passages relevant to `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SourceDocument>>;
}

/// Nearest-neighbour search over the chunk store. No relevance cutoff: the
/// `k` closest chunks are returned however far away they are.
pub struct VectorRetriever {
    repo: ChunkRepository,
    embedder: Arc<dyn Embedder>,
    /// Restrict retrieval to one paper.
    paper: Option<String>,
}

impl VectorRetriever {
    pub fn new(repo: ChunkRepository, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            repo,
            embedder,
            paper: None,
        }
    }

    pub fn within_paper(mut self, title: impl Into<String>) -> Self {
        self.paper = Some(title.into());
        self
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    #[instrument(skip(self, query), fields(query_chars = query.len()))]
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SourceDocument>> {
        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| ChatError::Retrieval(format!("{e:#}")))?;
        let hits = match &self.paper {
            Some(title) => self.repo.search_within_paper(&vector, k, title).await?,
            None => self.repo.search_similar(&vector, k).await?,
        };
        debug!(hits = hits.len(), paper = ?self.paper, "Retrieved chunks");
        Ok(hits.into_iter().map(SourceDocument::from).collect())
    }
}
