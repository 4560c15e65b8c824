//! LanceDB connection and housekeeping helpers.
//!
//! Provides the database open function, the on-disk existence check used
//! before every query, and a small key/value `meta` table describing how the
//! index was built.

use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use buddy_core::error::{Error, Result};
use buddy_core::types::IndexStatus;

use crate::schema::{build_meta_schema, META_TABLE};

pub async fn open_db(path: &Path) -> Result<Connection> {
    connect(path.to_string_lossy().as_ref()).execute().await.map_err(Error::storage)
}

/// On-disk directory LanceDB uses for `table` inside the database at `db_path`.
pub fn table_dir(db_path: &Path, table: &str) -> PathBuf {
    db_path.join(format!("{table}.lance"))
}

pub fn index_exists(db_path: &Path, table: &str) -> bool {
    table_dir(db_path, table).is_dir()
}

pub async fn write_meta(conn: &Connection, entries: &[(&str, String)]) -> Result<()> {
    let keys: Vec<String> = entries.iter().map(|(k, _)| (*k).to_string()).collect();
    let values: Vec<String> = entries.iter().map(|(_, v)| v.clone()).collect();
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![Arc::new(StringArray::from(keys)), Arc::new(StringArray::from(values))],
    )
    .map_err(Error::storage)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
    conn.create_table(META_TABLE, reader).execute().await.map_err(Error::storage)?;
    Ok(())
}

pub async fn read_meta(conn: &Connection) -> Result<HashMap<String, String>> {
    let names = conn.table_names().execute().await.map_err(Error::storage)?;
    if !names.iter().any(|n| n == META_TABLE) { return Ok(HashMap::new()); }
    let t = conn.open_table(META_TABLE).execute().await.map_err(Error::storage)?;
    let mut out = HashMap::new();
    let mut stream = t.query().execute().await.map_err(Error::storage)?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await.map_err(Error::storage)? {
        let key = string_column(&batch, "key")?;
        let value = string_column(&batch, "value")?;
        for i in 0..batch.num_rows() {
            out.insert(key.value(i).to_string(), value.value(i).to_string());
        }
    }
    Ok(out)
}

pub async fn read_status(conn: &Connection) -> Result<IndexStatus> {
    let meta = read_meta(conn).await?;
    let get = |k: &str| meta.get(k).cloned().unwrap_or_default();
    Ok(IndexStatus {
        embedder_id: get("embedder_id"),
        dim: get("dim").parse().unwrap_or(0),
        row_count: get("row_count").parse().unwrap_or(0),
        source: get("source"),
        built_at: get("built_at"),
    })
}

pub(crate) fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Storage(format!("column '{name}' missing or not utf8")))
}
