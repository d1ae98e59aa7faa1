//! LanceDB connection and housekeeping helpers.
//!
//! Provides the database open function, table existence checks, and a simple
//! key/value metadata table used to record when and how the store was filled.
use anyhow::{Result, anyhow};
use futures::TryStreamExt;
use lancedb::{connect, Connection};
use lancedb::query::{QueryBase, ExecutableQuery};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use std::sync::Arc;
use chrono::Utc;

use crate::schema::build_meta_schema;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    conn.create_empty_table(name, schema).execute().await?;
    Ok(())
}

/// Upsert one `key -> value` row in the meta table, creating it on first use.
pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    let schema = build_meta_schema();
    ensure_table(conn, table, schema.clone()).await?;
    let row = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![key])),
            Arc::new(StringArray::from(vec![value])),
            Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
        ],
    )?;
    let meta = conn.open_table(table).execute().await?;
    let mut upsert = meta.merge_insert(&["key"]);
    upsert.when_matched_update_all(None).when_not_matched_insert_all();
    upsert.execute(Box::new(RecordBatchIterator::new(vec![Ok(row)], schema))).await?;
    Ok(())
}

/// Value recorded under `key`, or `None` if the key (or the table) is absent.
pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    if !table_exists(conn, table).await? {
        return Ok(None);
    }
    let meta = conn.open_table(table).execute().await?;
    let filter = format!("key = '{}'", key.replace('\'', "''"));
    let batches: Vec<RecordBatch> = meta.query().only_if(filter).limit(1).execute().await?.try_collect().await?;
    let Some(batch) = batches.into_iter().find(|b| b.num_rows() > 0) else { return Ok(None) };
    let values = batch
        .column_by_name("value")
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("meta table has no string `value` column"))?;
    Ok(Some(values.value(0).to_string()))
}
