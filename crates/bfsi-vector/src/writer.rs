use anyhow::{Result, ensure};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Connection;
use std::sync::Arc;

use bfsi_core::types::DocumentChunk;

use crate::schema::build_chunk_schema;
use crate::table::table_exists;

pub fn chunks_to_record_batch(chunks: &[DocumentChunk], fingerprints: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
	ensure!(chunks.len() == fingerprints.len(), "chunks and fingerprints length must match");
	for fp in fingerprints {
		ensure!(fp.len() == dim, "fingerprint has {} dims, store expects {}", fp.len(), dim);
	}
	let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
	let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
	let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
	let vectors = fingerprints.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
	let record_batch = RecordBatch::try_new(build_chunk_schema(dim as i32), vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(texts)),
		Arc::new(StringArray::from(sources)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim as i32)),
	])?;
	Ok(record_batch)
}

pub async fn insert_batch(db: &Connection, table_name: &str, record_batch: RecordBatch) -> Result<()> {
	let schema = record_batch.schema();
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
	if table_exists(db, table_name).await? {
		db.open_table(table_name).execute().await?.add(reader).execute().await?;
	} else {
		db.create_table(table_name, reader).execute().await?;
	}
	Ok(())
}
