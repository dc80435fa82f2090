//! Chunk store against a real on-disk LanceDB in a temp directory.
//!
//! Run with: cargo test --package syntopical-db --test vector_store

use std::sync::Arc;
use syntopical_db::{Chunk, ChunkRepository, Database, DbError};

const DIM: usize = 4;

fn chunk(title: &str, index: usize, embedding: [f32; DIM]) -> Chunk {
    Chunk {
        id: Chunk::chunk_id(title, index),
        paper_hash: format!("hash-{title}"),
        chunk_index: index as i64,
        content: format!("{title} chunk {index}"),
        title: title.to_string(),
        authors: "Ada Lovelace, Alan Turing".to_string(),
        publication_date: Some("2023-05-01".to_string()),
        source_file: format!("/papers/{title}.pdf"),
        abstract_text: Some(format!("Abstract of {title}")),
        created_at: chrono::Utc::now(),
        embedding: embedding.to_vec(),
    }
}

async fn open_store(dir: &tempfile::TempDir) -> ChunkRepository {
    let db = Database::open(dir.path().join("lancedb")).await.unwrap();
    db.initialize(DIM).await.unwrap();
    ChunkRepository::new(Arc::new(db))
}

#[tokio::test]
async fn test_insert_and_list_papers() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .insert_batch(&[
            chunk("Graph Networks", 0, [1.0, 0.0, 0.0, 0.0]),
            chunk("Graph Networks", 1, [0.9, 0.1, 0.0, 0.0]),
            chunk("Diffusion Models", 0, [0.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 3);

    let papers = store.list_papers().await.unwrap();
    assert_eq!(papers.len(), 2);
    let graph = papers.iter().find(|p| p.title == "Graph Networks").unwrap();
    assert_eq!(graph.chunk_count, 2);
    assert_eq!(graph.authors, "Ada Lovelace, Alan Turing");
    assert_eq!(graph.publication_date.as_deref(), Some("2023-05-01"));

    let stats = store.database().stats().await.unwrap();
    assert_eq!(stats.papers, 2);
    assert_eq!(stats.chunks, 3);
}

#[tokio::test]
async fn test_search_returns_nearest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .insert_batch(&[
            chunk("A", 0, [1.0, 0.0, 0.0, 0.0]),
            chunk("B", 0, [0.0, 1.0, 0.0, 0.0]),
            chunk("C", 0, [0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    let hits = store.search_similar(&[0.1, 0.95, 0.0, 0.0], 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.title, "B");
    assert!(hits[0].distance.is_some());
    assert!(hits[0].distance <= hits[1].distance);
}

#[tokio::test]
async fn test_search_within_paper_ignores_closer_chunks_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .insert_batch(&[
            chunk("A", 0, [1.0, 0.0, 0.0, 0.0]),
            chunk("O'Brien Nets", 0, [0.0, 1.0, 0.0, 0.0]),
            chunk("O'Brien Nets", 1, [0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    let query = [1.0, 0.0, 0.1, 0.0];
    let hits = store.search_within_paper(&query, 5, "O'Brien Nets").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.chunk.title == "O'Brien Nets"));
    assert_eq!(hits[0].chunk.chunk_index, 1);

    let raw = store
        .search_similar_filtered(&query, 5, Some("title = 'A'"))
        .await
        .unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].chunk.title, "A");

    let none = store.search_within_paper(&query, 5, "Missing").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_search_on_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let hits = store.search_similar(&[1.0, 0.0, 0.0, 0.0], 5).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_delete_paper_removes_only_that_title() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .insert_batch(&[
            chunk("Keep Me", 0, [1.0, 0.0, 0.0, 0.0]),
            chunk("Drop Me", 0, [0.0, 1.0, 0.0, 0.0]),
            chunk("Drop Me", 1, [0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    let removed = store.delete_by_title("Drop Me").await.unwrap();
    assert_eq!(removed, 2);

    let titles: Vec<String> = store
        .list_papers()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["Keep Me".to_string()]);

    // Deleting an unknown title is a no-op.
    assert_eq!(store.delete_by_title("Never Added").await.unwrap(), 0);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_titles_with_quotes_are_escaped() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .insert_batch(&[chunk("Don't Stop Pretraining", 0, [1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();

    let found = store.find_by_title("Don't Stop Pretraining").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(store.delete_by_title("Don't Stop Pretraining").await.unwrap(), 1);
}

#[tokio::test]
async fn test_replace_paper_swaps_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .insert_batch(&[
            chunk("Paper", 0, [1.0, 0.0, 0.0, 0.0]),
            chunk("Paper", 1, [0.0, 1.0, 0.0, 0.0]),
            chunk("Paper", 2, [0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    store
        .replace_paper("Paper", &[chunk("Paper", 0, [0.0, 0.0, 0.0, 1.0])])
        .await
        .unwrap();

    let chunks = store.find_by_title("Paper").await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].embedding, vec![0.0, 0.0, 0.0, 1.0]);
}

#[tokio::test]
async fn test_dimension_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    let mut bad = chunk("Bad", 0, [1.0, 0.0, 0.0, 0.0]);
    bad.embedding.push(0.0);
    let err = store.insert_batch(&[bad]).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidEmbeddingDimension { expected: 4, actual: 5 }));

    let err = store.search_similar(&[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidEmbeddingDimension { expected: 4, actual: 2 }));
}

#[tokio::test]
async fn test_reopen_with_other_dimension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lancedb");

    let db = Database::open(&path).await.unwrap();
    db.initialize(DIM).await.unwrap();
    // Same width again is fine.
    db.initialize(DIM).await.unwrap();

    let reopened = Database::open(&path).await.unwrap();
    assert_eq!(reopened.embedding_dim().await.unwrap(), DIM);
    assert!(matches!(
        reopened.initialize(768).await,
        Err(DbError::InvalidEmbeddingDimension { expected: 4, actual: 768 })
    ));
}
