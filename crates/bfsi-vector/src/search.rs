use anyhow::{Result, anyhow};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{Connection, DistanceType};
use lancedb::query::{QueryBase, ExecutableQuery};
use std::path::Path;

use bfsi_core::traits::VectorStore;
use bfsi_core::types::{DocumentChunk, ScoredChunk};

use crate::table::{get_meta, open_db, set_meta, table_exists};
use crate::writer::{chunks_to_record_batch, insert_batch};

pub const META_TABLE: &str = "ingest_meta";

/// Chunk table in a LanceDB directory, searched by cosine distance.
pub struct LanceStore { pub(crate) db: Connection, pub(crate) table_name: String, dim: usize }

impl LanceStore {
	pub async fn open(store_dir: &Path, table_name: &str, dim: usize) -> Result<Self> {
		std::fs::create_dir_all(store_dir)?;
		let db = open_db(store_dir.to_string_lossy().as_ref()).await?;
		Ok(Self { db, table_name: table_name.to_string(), dim })
	}

	pub fn table_name(&self) -> &str { &self.table_name }
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("{} column missing", name))
}

#[async_trait]
impl VectorStore for LanceStore {
	async fn count(&self) -> Result<usize> {
		if !table_exists(&self.db, &self.table_name).await? { return Ok(0); }
		Ok(self.db.open_table(&self.table_name).execute().await?.count_rows(None).await?)
	}

	async fn add(&self, chunks: &[DocumentChunk], fingerprints: &[Vec<f32>]) -> Result<()> {
		if chunks.is_empty() { return Ok(()); }
		let batch = chunks_to_record_batch(chunks, fingerprints, self.dim)?;
		insert_batch(&self.db, &self.table_name, batch).await
	}

	async fn nearest(&self, fingerprint: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
		if k == 0 || !table_exists(&self.db, &self.table_name).await? { return Ok(vec![]); }
		let table = self.db.open_table(&self.table_name).execute().await?;
		let mut stream = table.vector_search(fingerprint.to_vec())?.distance_type(DistanceType::Cosine).limit(k).execute().await?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			let ids = string_col(&batch, "id")?;
			let texts = string_col(&batch, "text")?;
			let sources = string_col(&batch, "source")?;
			let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());
			for i in 0..batch.num_rows() {
				let score = match distances { Some(d) if !d.is_null(i) => 1.0 - d.value(i), _ => 0.0 };
				hits.push(ScoredChunk {
					chunk: DocumentChunk { id: ids.value(i).to_string(), text: texts.value(i).to_string(), source: sources.value(i).to_string() },
					score,
				});
			}
		}
		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		hits.truncate(k);
		Ok(hits)
	}

	async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
		set_meta(&self.db, META_TABLE, key, value).await
	}

	async fn meta(&self, key: &str) -> Result<Option<String>> {
		get_meta(&self.db, META_TABLE, key).await
	}
}
