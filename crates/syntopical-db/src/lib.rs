//! Syntopical vector store
//!
//! Embedded LanceDB storage for paper chunks. Every chunk row carries its
//! paper's metadata, so listing and deleting papers work off the same table
//! that serves similarity search.
//!
//! # Example
//!
//! ```rust,no_run
//! use syntopical_db::{ChunkRepository, Database, DEFAULT_EMBEDDING_DIM};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("./data/lancedb").await?;
//!     db.initialize(DEFAULT_EMBEDDING_DIM).await?;
//!
//!     let chunks = ChunkRepository::new(std::sync::Arc::new(db));
//!     for paper in chunks.list_papers().await? {
//!         println!("{} ({} chunks)", paper.title, paper.chunk_count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod chunks;
pub mod database;
pub mod error;
pub mod schema;
pub mod schema_arrow;

pub use chunks::ChunkRepository;
pub use database::{Database, DatabaseStats};
pub use error::{DbError, Result};
pub use schema::{Chunk, PaperRecord, ScoredChunk, DEFAULT_EMBEDDING_DIM, TABLE_CHUNKS};
