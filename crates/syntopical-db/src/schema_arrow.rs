//! Arrow schema and conversion utilities for LanceDB.
//!
//! Columns are looked up by name rather than position so that vector-search
//! results (which carry an extra `_distance` column) decode with the same code.

use crate::error::{DbError, Result};
use crate::schema::*;
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

// =============================================================================
// Chunk Arrow Conversion
// =============================================================================

fn embedding_item_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Float32, false))
}

pub fn chunk_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("paper_hash", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int64, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("authors", DataType::Utf8, false),
        Field::new("publication_date", DataType::Utf8, true),
        Field::new("source_file", DataType::Utf8, false),
        Field::new("abstract_text", DataType::Utf8, true),
        Field::new("created_at", DataType::Utf8, false),
        Field::new(
            EMBEDDING_COLUMN,
            DataType::FixedSizeList(embedding_item_field(), dim as i32),
            false,
        ),
    ]))
}

/// Read the vector width back out of a table schema.
pub fn embedding_dim_of(schema: &Schema) -> Result<usize> {
    let field = schema.field_with_name(EMBEDDING_COLUMN)?;
    match field.data_type() {
        DataType::FixedSizeList(_, n) => Ok(*n as usize),
        other => Err(DbError::Arrow(format!(
            "column '{EMBEDDING_COLUMN}' has unexpected type {other}"
        ))),
    }
}

/// Convert a batch of chunks into one RecordBatch. Every embedding must have
/// exactly `dim` components.
pub fn chunks_to_record(chunks: &[Chunk], dim: usize) -> Result<RecordBatch> {
    for chunk in chunks {
        if chunk.embedding.len() != dim {
            return Err(DbError::InvalidEmbeddingDimension {
                expected: dim,
                actual: chunk.embedding.len(),
            });
        }
    }

    let id = StringArray::from(chunks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>());
    let paper_hash =
        StringArray::from(chunks.iter().map(|c| c.paper_hash.as_str()).collect::<Vec<_>>());
    let chunk_index = Int64Array::from(chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>());
    let content = StringArray::from(chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>());
    let title = StringArray::from(chunks.iter().map(|c| c.title.as_str()).collect::<Vec<_>>());
    let authors = StringArray::from(chunks.iter().map(|c| c.authors.as_str()).collect::<Vec<_>>());
    let publication_date = StringArray::from(
        chunks
            .iter()
            .map(|c| c.publication_date.as_deref())
            .collect::<Vec<_>>(),
    );
    let source_file =
        StringArray::from(chunks.iter().map(|c| c.source_file.as_str()).collect::<Vec<_>>());
    let abstract_text = StringArray::from(
        chunks
            .iter()
            .map(|c| c.abstract_text.as_deref())
            .collect::<Vec<_>>(),
    );
    let created_at = StringArray::from(
        chunks
            .iter()
            .map(|c| c.created_at.to_rfc3339())
            .collect::<Vec<_>>(),
    );

    let flat: Vec<f32> = chunks
        .iter()
        .flat_map(|c| c.embedding.iter().copied())
        .collect();
    let values: ArrayRef = Arc::new(Float32Array::from(flat));
    let embedding = FixedSizeListArray::try_new(embedding_item_field(), dim as i32, values, None)?;

    RecordBatch::try_new(
        chunk_schema(dim),
        vec![
            Arc::new(id) as ArrayRef,
            Arc::new(paper_hash),
            Arc::new(chunk_index),
            Arc::new(content),
            Arc::new(title),
            Arc::new(authors),
            Arc::new(publication_date),
            Arc::new(source_file),
            Arc::new(abstract_text),
            Arc::new(created_at),
            Arc::new(embedding),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

// ── Column accessors ────────────────────────────────────────────────────────

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DbError::Arrow(format!("missing column '{name}'")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DbError::Arrow(format!("column '{name}' has unexpected type")))
}

fn get_string(batch: &RecordBatch, name: &str, row: usize) -> Result<String> {
    Ok(column::<StringArray>(batch, name)?.value(row).to_string())
}

fn get_opt_string(batch: &RecordBatch, name: &str, row: usize) -> Result<Option<String>> {
    let arr = column::<StringArray>(batch, name)?;
    Ok(if arr.is_null(row) {
        None
    } else {
        Some(arr.value(row).to_string())
    })
}

/// Decode one row into a [`Chunk`].
pub fn record_to_chunk(batch: &RecordBatch, row: usize) -> Result<Chunk> {
    let embeddings = column::<FixedSizeListArray>(batch, EMBEDDING_COLUMN)?;
    let values = embeddings.value(row);
    let embedding = values
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| DbError::Arrow("embedding values are not f32".to_string()))?
        .values()
        .to_vec();

    let created_at = get_string(batch, "created_at", row)?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now());

    Ok(Chunk {
        id: get_string(batch, "id", row)?,
        paper_hash: get_string(batch, "paper_hash", row)?,
        chunk_index: column::<Int64Array>(batch, "chunk_index")?.value(row),
        content: get_string(batch, "content", row)?,
        title: get_string(batch, "title", row)?,
        authors: get_string(batch, "authors", row)?,
        publication_date: get_opt_string(batch, "publication_date", row)?,
        source_file: get_string(batch, "source_file", row)?,
        abstract_text: get_opt_string(batch, "abstract_text", row)?,
        created_at,
        embedding,
    })
}

/// The `_distance` value LanceDB attaches to vector-search rows, if present.
pub fn distance_at(batch: &RecordBatch, row: usize) -> Option<f32> {
    let arr = batch
        .column_by_name(DISTANCE_COLUMN)?
        .as_any()
        .downcast_ref::<Float32Array>()?;
    if arr.is_null(row) {
        None
    } else {
        Some(arr.value(row))
    }
}
