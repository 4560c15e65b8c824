use arrow_array::{Array, Float32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use buddy_core::config::IndexSettings;
use buddy_core::error::{Error, Result};
use buddy_core::traits::Embedder;
use buddy_core::types::{IndexStatus, RetrievedDocument};

use crate::table::{index_exists, open_db, read_status, string_column};

/// Nearest-neighbour lookup over a built knowledgebase.
///
/// The index is reopened on every call, so a rebuild that swapped the
/// directory is picked up without restarting.
pub struct Retriever {
	db_path: PathBuf,
	table: String,
	embedder: Arc<dyn Embedder>,
}

impl Retriever {
	pub fn new(embedder: Arc<dyn Embedder>, settings: &IndexSettings) -> Self {
		Self { db_path: settings.path.clone(), table: settings.table.clone(), embedder }
	}

	pub fn db_path(&self) -> &Path { &self.db_path }

	pub fn exists(&self) -> bool { index_exists(&self.db_path, &self.table) }

	pub async fn status(&self) -> Result<IndexStatus> {
		if !self.exists() { return Err(Error::IndexMissing(self.db_path.clone())); }
		let conn = open_db(&self.db_path).await?;
		read_status(&conn).await
	}

	/// Up to `k` documents ordered by descending similarity to `query`.
	pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
		if !self.exists() { return Err(Error::IndexMissing(self.db_path.clone())); }
		if k == 0 { return Ok(Vec::new()); }

		let conn = open_db(&self.db_path).await?;
		let status = read_status(&conn).await?;
		if status.dim != 0 && status.dim != self.embedder.dim() {
			return Err(Error::Storage(format!(
				"index was built with dim {} but embedder {} produces dim {}; rebuild the knowledgebase",
				status.dim, self.embedder.id(), self.embedder.dim()
			)));
		}
		if !status.embedder_id.is_empty() && status.embedder_id != self.embedder.id() {
			warn!(built_with = %status.embedder_id, querying_with = %self.embedder.id(), "embedder differs from the one used to build the index");
		}

		let embedder = Arc::clone(&self.embedder);
		let text = query.to_string();
		let query_vec = tokio::task::spawn_blocking(move || embedder.embed_one(&text))
			.await
			.map_err(|e| Error::Upstream { service: "embedding", message: e.to_string() })?
			.map_err(|e| Error::upstream("embedding", &e))?;
		let table = conn.open_table(&self.table).execute().await.map_err(Error::storage)?;
		let mut stream = table
			.vector_search(query_vec)
			.map_err(Error::storage)?
			.distance_type(DistanceType::Cosine)
			.limit(k)
			.execute()
			.await
			.map_err(Error::storage)?;

		let mut docs = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
			let ids = string_column(&batch, "id")?;
			let prompts = string_column(&batch, "prompt")?;
			let contents = string_column(&batch, "content")?;
			let distances = batch
				.column_by_name("_distance")
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| Error::Storage("search result has no _distance column".into()))?;
			for i in 0..batch.num_rows() {
				docs.push(RetrievedDocument {
					id: ids.value(i).to_string(),
					prompt: prompts.value(i).to_string(),
					content: contents.value(i).to_string(),
					score: 1.0 - distances.value(i),
				});
			}
		}
		docs.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		docs.truncate(k);
		debug!(k, hits = docs.len(), "retrieved");
		Ok(docs)
	}
}
