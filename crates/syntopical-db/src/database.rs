//! Database connection and table management.

use crate::error::{DbError, Result};
use crate::schema;
use crate::schema_arrow::{chunk_schema, embedding_dim_of};
use arrow_array::RecordBatchIterator;
use lancedb::connection::Connection;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the specified path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            std::fs::create_dir_all(path.as_ref())?;
        }

        let conn = lancedb::connect(&path_str).execute().await?;
        debug!("Opened LanceDB connection");

        Ok(Self { conn })
    }

    /// Create the chunks table for vectors of width `dim`, or verify that an
    /// existing table was created with that width.
    ///
    /// LanceDB fixes the vector width in the table schema, so a store built
    /// with one embedding model cannot be reused with another.
    pub async fn initialize(&self, dim: usize) -> Result<()> {
        if self.table_exists(schema::TABLE_CHUNKS).await? {
            let existing = self.embedding_dim().await?;
            if existing != dim {
                return Err(DbError::InvalidEmbeddingDimension {
                    expected: existing,
                    actual: dim,
                });
            }
            return Ok(());
        }

        let schema = chunk_schema(dim);
        let empty_iter = RecordBatchIterator::new(vec![], schema);
        self.conn
            .create_table(schema::TABLE_CHUNKS, empty_iter)
            .execute()
            .await?;
        info!(dim, "Created chunks table");
        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self.conn.table_names().execute().await?;
        Ok(tables.iter().any(|t| t == name))
    }

    /// Vector width of the chunks table.
    pub async fn embedding_dim(&self) -> Result<usize> {
        let table = self.chunks_table().await?;
        let schema = table.schema().await?;
        embedding_dim_of(&schema)
    }

    pub(crate) async fn chunks_table(&self) -> Result<lancedb::Table> {
        if !self.table_exists(schema::TABLE_CHUNKS).await? {
            return Err(DbError::TableNotFound(schema::TABLE_CHUNKS.to_string()));
        }
        Ok(self
            .conn
            .open_table(schema::TABLE_CHUNKS)
            .execute()
            .await?)
    }

    /// Row counts for display.
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let table = self.chunks_table().await?;
        let chunks = table.count_rows(None).await? as u64;
        let papers = crate::chunks::ChunkRepository::from_db(self.clone())
            .list_papers()
            .await?
            .len() as u64;
        Ok(DatabaseStats { papers, chunks })
    }
}

/// Database statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub papers: u64,
    pub chunks: u64,
}
