//! PaperIndexer end to end: generated PDFs, offline embedder, real LanceDB.

mod common;

use common::{long_paper_lines, write_pdf, FailingEmbedder, FakeEmbedder, FAKE_DIM};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use syntopical_db::{ChunkRepository, Database};
use syntopical_ingestion::pdf_parser::process_pdf;
use syntopical_ingestion::{ChunkerConfig, IngestionProgress, PaperIndexer};

async fn store(dir: &tempfile::TempDir) -> ChunkRepository {
    let db = Database::open(dir.path().join("lancedb")).await.unwrap();
    db.initialize(FAKE_DIM).await.unwrap();
    ChunkRepository::new(Arc::new(db))
}

fn write_long_paper(dir: &tempfile::TempDir, name: &str, title: &str) -> PathBuf {
    let path = dir.path().join(name);
    let lines = long_paper_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_pdf(
        &path,
        &[("Title", title), ("Author", "Jane Doe, John Roe")],
        &[&refs],
    );
    path
}

#[tokio::test]
async fn test_add_paper_stores_chunks_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let repo = store(&dir).await;
    let embedder = Arc::new(FakeEmbedder::default());
    let indexer = PaperIndexer::new(repo.clone(), embedder.clone()).with_batch_size(2);

    let path = write_long_paper(&dir, "sparse.pdf", "Sparse Retrieval Revisited");
    let paper = process_pdf(&path).unwrap();
    let expected = syntopical_ingestion::chunker::expected_chunk_count(
        paper.text.chars().count(),
        &ChunkerConfig::default(),
    );

    let ids = indexer.add_paper(&paper).await.unwrap();
    assert_eq!(ids.len(), expected);
    assert!(ids.len() > 1);
    assert_eq!(ids[0], "Sparse Retrieval Revisited-0");
    // Batches of two.
    assert_eq!(embedder.calls.load(Ordering::SeqCst), ids.len().div_ceil(2));

    let papers = repo.list_papers().await.unwrap();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].title, "Sparse Retrieval Revisited");
    assert_eq!(papers[0].authors, "Jane Doe, John Roe");
    assert_eq!(papers[0].chunk_count, ids.len());
    assert!(papers[0]
        .abstract_text
        .as_deref()
        .unwrap_or_default()
        .contains("sparse retrieval"));
}

#[tokio::test]
async fn test_reindexing_same_title_replaces_rows() {
    let dir = tempfile::tempdir().unwrap();
    let repo = store(&dir).await;
    let indexer = PaperIndexer::new(repo.clone(), Arc::new(FakeEmbedder::default()));

    let path = write_long_paper(&dir, "a.pdf", "Same Title");
    let first = indexer.ingest_pdf(&path).await.unwrap();
    let second = indexer.ingest_pdf(&path).await.unwrap();

    assert_eq!(first.chunk_ids, second.chunk_ids);
    assert_eq!(repo.count().await.unwrap() as usize, second.chunk_ids.len());
}

#[tokio::test]
async fn test_embedding_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let repo = store(&dir).await;
    let indexer = PaperIndexer::new(repo.clone(), Arc::new(FailingEmbedder));

    let path = write_long_paper(&dir, "a.pdf", "Never Stored");
    assert!(indexer.ingest_pdf(&path).await.is_err());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_paper_without_text_is_reported_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let repo = store(&dir).await;
    let indexer = PaperIndexer::new(repo.clone(), Arc::new(FakeEmbedder::default()));

    let stored = write_long_paper(&dir, "scan.pdf", "Scanned Paper");
    indexer.ingest_pdf(&stored).await.unwrap();
    let before = repo.count().await.unwrap();

    let blank_page: &[&str] = &[];
    let blank = dir.path().join("scan_v2.pdf");
    write_pdf(&blank, &[("Title", "Scanned Paper")], &[blank_page]);

    let report = indexer.ingest_paths(&[blank.clone()]).await;
    assert_eq!(report.papers_indexed(), 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, blank);
    assert!(report.errors[0].1.contains("no extractable text"));
    // The earlier version stays searchable.
    assert_eq!(repo.count().await.unwrap(), before);
}

#[tokio::test]
async fn test_ingest_paths_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let repo = store(&dir).await;
    let indexer = PaperIndexer::new(repo.clone(), Arc::new(FakeEmbedder::default()));

    let good = write_long_paper(&dir, "good.pdf", "Good Paper");
    let bad = dir.path().join("bad.pdf");
    std::fs::write(&bad, b"not a pdf").unwrap();
    let also_good = write_long_paper(&dir, "also_good.pdf", "Another Good Paper");

    let mut events = Vec::new();
    let report = indexer
        .ingest_paths_with_progress(&[good, bad.clone(), also_good], |e| events.push(e.clone()))
        .await;

    assert_eq!(report.papers_found, 3);
    assert_eq!(report.papers_indexed(), 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, bad);
    assert_eq!(repo.list_papers().await.unwrap().len(), 2);

    let failed = events
        .iter()
        .filter(|e| matches!(e, IngestionProgress::Failed { .. }))
        .count();
    assert_eq!(failed, 1);
    assert_eq!(events.len(), 6);
}

#[tokio::test]
async fn test_indexed_chunks_are_searchable() {
    let dir = tempfile::tempdir().unwrap();
    let repo = store(&dir).await;
    let indexer = PaperIndexer::new(repo.clone(), Arc::new(FakeEmbedder::default()));

    let path = write_long_paper(&dir, "a.pdf", "Searchable");
    indexer.ingest_pdf(&path).await.unwrap();

    let query = FakeEmbedder::vector("lexical matching remains a strong baseline");
    let hits = repo.search_similar(&query, 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.chunk.title == "Searchable"));
}
