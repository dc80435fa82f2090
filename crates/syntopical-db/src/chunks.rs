//! Chunk repository.
//!
//! CRUD over the chunk table plus vector search. Papers are addressed by
//! title; deleting a paper removes every chunk carrying that title.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{sql_literal, Chunk, PaperRecord, ScoredChunk};
use crate::schema_arrow::{chunks_to_record, distance_at, record_to_chunk};
use arrow_array::{RecordBatch, RecordBatchIterator};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Repository for chunk operations.
#[derive(Clone)]
pub struct ChunkRepository {
    db: Arc<Database>,
}

impl ChunkRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn from_db(db: Database) -> Self {
        Self::new(Arc::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert multiple chunks in bulk. All embeddings must match the table's
    /// vector width; nothing is written otherwise.
    #[instrument(skip_all, fields(count = chunks.len()))]
    pub async fn insert_batch(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let table = self.db.chunks_table().await?;
        let dim = self.db.embedding_dim().await?;
        let record = chunks_to_record(chunks, dim)?;
        let schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], schema);

        table.add(iter).execute().await?;
        debug!("Inserted chunks");
        Ok(())
    }

    /// Replace every chunk stored under `title` with `chunks`.
    pub async fn replace_paper(&self, title: &str, chunks: &[Chunk]) -> Result<()> {
        // Validate before deleting so a bad batch never leaves the paper missing.
        let dim = self.db.embedding_dim().await?;
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dim) {
            return Err(DbError::InvalidEmbeddingDimension {
                expected: dim,
                actual: bad.embedding.len(),
            });
        }
        self.delete_by_title(title).await?;
        self.insert_batch(chunks).await
    }

    /// Top-`k` chunks nearest to `query_vector`, closest first.
    pub async fn search_similar(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        self.search_similar_filtered(query_vector, k, None).await
    }

    /// Top-`k` chunks of the paper titled `title`, closest first.
    pub async fn search_within_paper(
        &self,
        query_vector: &[f32],
        k: usize,
        title: &str,
    ) -> Result<Vec<ScoredChunk>> {
        let filter = format!("title = {}", sql_literal(title));
        self.search_similar_filtered(query_vector, k, Some(&filter))
            .await
    }

    /// Vector search with an optional LanceDB filter expression applied
    /// before ranking.
    #[instrument(skip(self, query_vector))]
    pub async fn search_similar_filtered(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        let table = self.db.chunks_table().await?;
        let dim = self.db.embedding_dim().await?;
        if query_vector.len() != dim {
            return Err(DbError::InvalidEmbeddingDimension {
                expected: dim,
                actual: query_vector.len(),
            });
        }
        if k == 0 || table.count_rows(None).await? == 0 {
            return Ok(Vec::new());
        }

        let mut query = table.vector_search(query_vector.to_vec())?.limit(k);
        if let Some(filter) = filter {
            query = query.only_if(filter);
        }

        let mut stream = query.execute().await?;
        let mut results = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                results.push(ScoredChunk {
                    chunk: record_to_chunk(&batch, i)?,
                    distance: distance_at(&batch, i),
                });
            }
        }

        results.sort_by(|a, b| {
            let da = a.distance.unwrap_or(f32::MAX);
            let db = b.distance.unwrap_or(f32::MAX);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }

    /// All chunks of the paper with this title, in chunk order.
    pub async fn find_by_title(&self, title: &str) -> Result<Vec<Chunk>> {
        let batches = self
            .scan(Some(format!("title = {}", sql_literal(title))))
            .await?;
        let mut chunks = Vec::new();
        for batch in &batches {
            for i in 0..batch.num_rows() {
                chunks.push(record_to_chunk(batch, i)?);
            }
        }
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    /// One record per distinct title, in first-seen order.
    pub async fn list_papers(&self) -> Result<Vec<PaperRecord>> {
        let batches = self.scan(None).await?;

        let mut order: Vec<String> = Vec::new();
        let mut papers: HashMap<String, PaperRecord> = HashMap::new();
        for batch in &batches {
            for i in 0..batch.num_rows() {
                let chunk = record_to_chunk(batch, i)?;
                let entry = papers.entry(chunk.title.clone()).or_insert_with(|| {
                    order.push(chunk.title.clone());
                    PaperRecord::from(&chunk)
                });
                entry.chunk_count += 1;
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|title| papers.remove(&title))
            .collect())
    }

    /// Remove every chunk whose title equals `title`. Returns the number of
    /// rows removed.
    #[instrument(skip(self))]
    pub async fn delete_by_title(&self, title: &str) -> Result<u64> {
        let table = self.db.chunks_table().await?;
        let filter = format!("title = {}", sql_literal(title));
        let before = table.count_rows(Some(filter.clone())).await?;
        if before > 0 {
            table.delete(&filter).await?;
            info!(removed = before, "Deleted paper chunks");
        }
        Ok(before as u64)
    }

    /// Count total chunks.
    pub async fn count(&self) -> Result<u64> {
        let table = self.db.chunks_table().await?;
        Ok(table.count_rows(None).await? as u64)
    }

    /// Full scan with an optional filter. The row limit is set explicitly
    /// because plain queries otherwise fall back to a small default.
    async fn scan(&self, filter: Option<String>) -> Result<Vec<RecordBatch>> {
        let table = self.db.chunks_table().await?;
        let total = table.count_rows(None).await?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut query = table.query().limit(total);
        if let Some(filter) = filter {
            query = query.only_if(filter);
        }

        let mut stream = query.execute().await?;
        let mut batches = Vec::new();
        while let Some(batch) = stream.next().await {
            batches.push(batch?);
        }
        Ok(batches)
    }
}
