//! Row types for the LanceDB chunk table.
//!
//! The store keeps a single table of chunks. Paper-level metadata is copied
//! onto every chunk, so a "paper" is simply the set of rows sharing a title.

use serde::{Deserialize, Serialize};

/// Default embedding dimension (all-MiniLM-L6-v2 outputs 384-dim vectors).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

pub const TABLE_CHUNKS: &str = "chunks";

/// Column holding the vector; LanceDB appends `_distance` next to it in
/// vector-search results.
pub const EMBEDDING_COLUMN: &str = "embedding";
pub const DISTANCE_COLUMN: &str = "_distance";

// =============================================================================
// Chunk Schema
// =============================================================================

/// One embedded window of a paper's text, tagged with its paper's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{title}-{chunk_index}"`
    pub id: String,
    /// SHA-256 of the paper's full text (hex). Distinguishes papers that
    /// happen to share a title.
    pub paper_hash: String,
    pub chunk_index: i64,
    pub content: String,
    pub title: String,
    /// Author names joined with `", "`.
    pub authors: String,
    pub publication_date: Option<String>,
    pub source_file: String,
    pub abstract_text: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn chunk_id(title: &str, chunk_index: usize) -> String {
        format!("{title}-{chunk_index}")
    }
}

/// A chunk returned from a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Distance reported by the vector index (smaller is closer). `None` for
    /// plain scans.
    pub distance: Option<f32>,
}

// =============================================================================
// Paper listing
// =============================================================================

/// Paper-level view reconstructed from the first chunk seen for a title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: String,
    pub publication_date: Option<String>,
    pub source_file: String,
    pub abstract_text: Option<String>,
    pub paper_hash: String,
    pub chunk_count: usize,
}

impl From<&Chunk> for PaperRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            title: chunk.title.clone(),
            authors: chunk.authors.clone(),
            publication_date: chunk.publication_date.clone(),
            source_file: chunk.source_file.clone(),
            abstract_text: chunk.abstract_text.clone(),
            paper_hash: chunk.paper_hash.clone(),
            chunk_count: 0,
        }
    }
}

/// Quote a string literal for a LanceDB filter expression.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
