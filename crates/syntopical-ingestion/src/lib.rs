//! syntopical-ingestion: getting papers into the vector store.
//!
//! - PDF metadata, text and abstract extraction (`pdf_parser`)
//! - Fixed-window chunking (`chunker`)
//! - Embedding clients (`embedding`)
//! - Chunk → embed → store indexing (`pipeline`)
//! - arXiv search and download (`sources::arxiv`)

pub mod chunker;
pub mod embedding;
pub mod models;
pub mod pdf_parser;
pub mod pipeline;
pub mod sources;

pub use chunker::{chunk_text, ChunkerConfig};
pub use embedding::{Embedder, EmbeddingBackend, EmbeddingClient, EmbeddingConfig};
pub use models::{AbstractBoundary, PaperContent, PaperMetadata, TitleSource};
pub use pipeline::{pdf_files_in, IndexedPaper, IngestionProgress, IngestionReport, PaperIndexer};
pub use sources::arxiv::{ArxivClient, ArxivPaper};
