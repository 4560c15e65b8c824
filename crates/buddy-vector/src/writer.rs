use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use buddy_core::config::IndexSettings;
use buddy_core::error::{Error, Result};
use buddy_core::source::SourceLoader;
use buddy_core::traits::Embedder;
use buddy_core::types::{BuildReport, SourceRecord};

use crate::index_build::{build_ivfpq_index, compute_ivfpq_params};
use crate::schema::build_documents_schema;
use crate::table::{open_db, write_meta};

const EMBED_BATCH: usize = 64;
const WRITE_BATCH: usize = 1000;

/// Builds the knowledgebase from the FAQ table.
///
/// Every build is a full replace: rows are written into a sibling staging
/// directory which is swapped in only after all writes succeed, so a failed
/// build leaves the previous index readable.
pub struct KnowledgeBaseBuilder {
	embedder: Arc<dyn Embedder>,
	settings: IndexSettings,
	loader: SourceLoader,
	show_progress: bool,
}

impl KnowledgeBaseBuilder {
	pub fn new(embedder: Arc<dyn Embedder>, settings: IndexSettings, loader: SourceLoader) -> Self {
		Self { embedder, settings, loader, show_progress: false }
	}

	/// Draw an indicatif bar while embedding (CLI use).
	pub fn with_progress(mut self, show: bool) -> Self {
		self.show_progress = show;
		self
	}

	pub fn index_path(&self) -> &Path { &self.settings.path }

	pub fn table(&self) -> &str { &self.settings.table }

	pub async fn build_index(&self, source_path: &Path) -> Result<BuildReport> {
		let started = Instant::now();
		let records = self.loader.load(source_path)?;

		let staging = staging_path(&self.settings.path);
		if staging.exists() {
			warn!(path = %staging.display(), "removing leftover staging directory");
			std::fs::remove_dir_all(&staging).map_err(Error::storage)?;
		}

		let written = self.write_staging(&staging, &records, source_path).await;
		if let Err(e) = written {
			if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
				debug!(error = %cleanup, "staging cleanup failed");
			}
			return Err(e);
		}
		swap_into_place(&staging, &self.settings.path)?;

		let report = BuildReport {
			documents: records.len(),
			dim: self.embedder.dim(),
			embedder_id: self.embedder.id().to_string(),
			elapsed: started.elapsed(),
		};
		info!(
			documents = report.documents,
			dim = report.dim,
			embedder = %report.embedder_id,
			path = %self.settings.path.display(),
			"knowledgebase built in {:.2?}", report.elapsed
		);
		Ok(report)
	}

	async fn write_staging(&self, staging: &Path, records: &[SourceRecord], source_path: &Path) -> Result<()> {
		std::fs::create_dir_all(staging).map_err(Error::storage)?;
		let vectors = self.embed_records(records).await?;
		let dim = self.embedder.dim();

		let conn = open_db(staging).await?;
		let schema = build_documents_schema(dim as i32);
		let mut batches = Vec::new();
		for (recs, vecs) in records.chunks(WRITE_BATCH).zip(vectors.chunks(WRITE_BATCH)) {
			batches.push(Ok(to_record_batch(recs, vecs, dim)?));
		}
		let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
		conn.create_table(&self.settings.table, reader).execute().await.map_err(Error::storage)?;

		write_meta(&conn, &[
			("embedder_id", self.embedder.id().to_string()),
			("dim", dim.to_string()),
			("row_count", records.len().to_string()),
			("source", source_path.display().to_string()),
			("built_at", chrono::Utc::now().to_rfc3339()),
		])
		.await?;

		if records.len() >= self.settings.ann_min_rows {
			let params = compute_ivfpq_params(records.len(), dim);
			build_ivfpq_index(&conn, &self.settings.table, &params).await?;
		}
		Ok(())
	}

	/// Runs the embedder on the blocking pool so async workers stay free during a rebuild.
	async fn embed_records(&self, records: &[SourceRecord]) -> Result<Vec<Vec<f32>>> {
		let embedder = Arc::clone(&self.embedder);
		let texts: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
		let show_progress = self.show_progress;
		tokio::task::spawn_blocking(move || embed_texts(embedder.as_ref(), &texts, show_progress))
			.await
			.map_err(|e| Error::Upstream { service: "embedding", message: e.to_string() })?
	}
}

fn embed_texts(embedder: &dyn Embedder, texts: &[String], show_progress: bool) -> Result<Vec<Vec<f32>>> {
	let dim = embedder.dim();
	let pb = if show_progress { ProgressBar::new(texts.len() as u64) } else { ProgressBar::hidden() };
	pb.set_style(
		ProgressStyle::default_bar()
			.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%) {msg}")
			.unwrap_or_else(|_| ProgressStyle::default_bar())
			.progress_chars("#>-"),
	);

	let mut out = Vec::with_capacity(texts.len());
	for chunk in texts.chunks(EMBED_BATCH) {
		let vecs = embedder.embed_batch(chunk).map_err(|e| Error::upstream("embedding", &e))?;
		if vecs.len() != chunk.len() {
			return Err(Error::Upstream {
				service: "embedding",
				message: format!("expected {} vectors, got {}", chunk.len(), vecs.len()),
			});
		}
		if let Some(bad) = vecs.iter().find(|v| v.len() != dim) {
			return Err(Error::Upstream {
				service: "embedding",
				message: format!("vector has length {}, expected {dim}", bad.len()),
			});
		}
		out.extend(vecs);
		pb.inc(chunk.len() as u64);
	}
	pb.finish_with_message("embedded");
	Ok(out)
}

fn to_record_batch(records: &[SourceRecord], vectors: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
	let ids: Vec<String> = records.iter().map(SourceRecord::id).collect();
	let prompts: Vec<&str> = records.iter().map(|r| r.prompt.as_str()).collect();
	let contents: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
	let rows: Vec<i32> = records.iter().map(|r| r.row as i32).collect();
	let vectors = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
	RecordBatch::try_new(build_documents_schema(dim as i32), vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(prompts)),
		Arc::new(StringArray::from(contents)),
		Arc::new(Int32Array::from(rows)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
	])
	.map_err(Error::storage)
}

/// `knowledge_index` -> `knowledge_index.building`
pub fn staging_path(index_path: &Path) -> PathBuf {
	sibling_path(index_path, ".building")
}

fn sibling_path(index_path: &Path, suffix: &str) -> PathBuf {
	let mut s: OsString = index_path.as_os_str().to_owned();
	s.push(suffix);
	PathBuf::from(s)
}

/// Moves the current index aside, renames `staging` into place, then deletes
/// the old copy. If the rename fails the old index is moved back.
fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
	if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
		std::fs::create_dir_all(parent).map_err(Error::storage)?;
	}
	let retired = sibling_path(target, ".old");
	if retired.exists() {
		std::fs::remove_dir_all(&retired).map_err(Error::storage)?;
	}
	let had_previous = target.exists();
	if had_previous {
		std::fs::rename(target, &retired).map_err(Error::storage)?;
	}
	if let Err(e) = std::fs::rename(staging, target) {
		if had_previous {
			if let Err(restore) = std::fs::rename(&retired, target) {
				warn!(error = %restore, path = %retired.display(), "could not restore previous index");
			}
		}
		return Err(Error::storage(e));
	}
	if had_previous {
		if let Err(e) = std::fs::remove_dir_all(&retired) {
			warn!(error = %e, path = %retired.display(), "previous index left on disk");
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn staging_is_a_sibling() {
		assert_eq!(staging_path(Path::new("/tmp/kb")), PathBuf::from("/tmp/kb.building"));
		assert_eq!(staging_path(Path::new("knowledge_index")), PathBuf::from("knowledge_index.building"));
	}

	fn dir_with(path: &Path, file: &str) {
		std::fs::create_dir_all(path).expect("mkdir");
		std::fs::write(path.join(file), file).expect("write");
	}

	#[test]
	fn swap_replaces_previous_index_and_cleans_up() {
		let tmp = tempfile::TempDir::new().expect("tmp");
		let target = tmp.path().join("kb");
		let staging = staging_path(&target);
		dir_with(&target, "old");
		dir_with(&staging, "new");

		swap_into_place(&staging, &target).expect("swap");
		assert!(target.join("new").exists());
		assert!(!target.join("old").exists());
		assert!(!staging.exists());
		assert!(!sibling_path(&target, ".old").exists());
	}

	#[test]
	fn failed_swap_restores_previous_index() {
		let tmp = tempfile::TempDir::new().expect("tmp");
		let target = tmp.path().join("kb");
		dir_with(&target, "old");

		let err = swap_into_place(&tmp.path().join("missing.building"), &target).unwrap_err();
		assert!(matches!(err, Error::Storage(_)), "{err:?}");
		assert!(target.join("old").exists());
		assert!(!sibling_path(&target, ".old").exists());
	}

	#[test]
	fn swap_into_fresh_location() {
		let tmp = tempfile::TempDir::new().expect("tmp");
		let target = tmp.path().join("nested").join("kb");
		let staging = tmp.path().join("kb.building");
		dir_with(&staging, "new");
		swap_into_place(&staging, &target).expect("swap");
		assert!(target.join("new").exists());
	}
}
