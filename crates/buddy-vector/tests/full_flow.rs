use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use buddy_core::config::IndexSettings;
use buddy_core::source::SourceLoader;
use buddy_core::traits::Embedder;
use buddy_core::Error;
use buddy_embed::FakeEmbedder;
use buddy_vector::writer::staging_path;
use buddy_vector::{KnowledgeBaseBuilder, Retriever};
use tempfile::TempDir;

const FAQ: &str = "prompt,response\n\
I miss my ex,Arre yaar breakup ke baad thoda time do khud ko\n\
How do I make new friends,Join a club or sports team and say hello\n\
My partner ignores my texts,Talk openly about communication needs\n\
Is it okay to cry after a breakup,Crying is healthy and lets the sadness out\n";

fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
	let p = dir.join(name);
	std::fs::write(&p, body).expect("write csv");
	p
}

fn settings(dir: &Path) -> IndexSettings {
	IndexSettings { path: dir.join("knowledge_index"), table: "documents".into(), ann_min_rows: 10_000 }
}

fn fake() -> Arc<dyn Embedder> { Arc::new(FakeEmbedder::new(64)) }

struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
	fn id(&self) -> &str { "broken" }
	fn dim(&self) -> usize { 64 }
	fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
		anyhow::bail!("model crashed")
	}
}

#[tokio::test]
async fn every_row_retrieves_itself_first() {
	let tmp = TempDir::new().expect("tmp");
	let csv = write_csv(tmp.path(), "faq.csv", FAQ);
	let cfg = settings(tmp.path());
	let builder = KnowledgeBaseBuilder::new(fake(), cfg.clone(), SourceLoader::default());
	let report = builder.build_index(&csv).await.expect("build");
	assert_eq!(report.documents, 4);
	assert_eq!(report.dim, 64);
	assert_eq!(report.embedder_id, "fake:d64");

	let records = SourceLoader::default().load(&csv).expect("load");
	let retriever = Retriever::new(fake(), &cfg);
	for rec in &records {
		let hits = retriever.retrieve(&rec.content, 3).await.expect("retrieve");
		assert_eq!(hits.len(), 3);
		assert_eq!(hits[0].id, rec.id());
		assert_eq!(hits[0].content, rec.content);
		assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
	}
}

#[tokio::test]
async fn every_prompt_finds_its_row_in_top_k() {
	let tmp = TempDir::new().expect("tmp");
	let csv = write_csv(tmp.path(), "faq.csv", FAQ);
	let cfg = settings(tmp.path());
	KnowledgeBaseBuilder::new(fake(), cfg.clone(), SourceLoader::default()).build_index(&csv).await.expect("build");

	let retriever = Retriever::new(fake(), &cfg);
	for rec in SourceLoader::default().load(&csv).expect("load") {
		let hits = retriever.retrieve(&rec.prompt, 3).await.expect("retrieve");
		assert!(hits.iter().any(|h| h.id == rec.id()), "{:?} not in {:?}", rec.prompt, hits);
	}
}

#[tokio::test]
async fn bundled_faq_prompts_find_their_rows() {
	let csv = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/relationship_faqs.csv");
	let tmp = TempDir::new().expect("tmp");
	let cfg = settings(tmp.path());
	let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(384));
	KnowledgeBaseBuilder::new(embedder.clone(), cfg.clone(), SourceLoader::default()).build_index(&csv).await.expect("build");

	let retriever = Retriever::new(embedder, &cfg);
	let records = SourceLoader::default().load(&csv).expect("load");
	assert_eq!(records.len(), 30);
	for rec in &records {
		let hits = retriever.retrieve(&rec.prompt, 3).await.expect("retrieve");
		assert!(hits.iter().any(|h| h.id == rec.id()), "{:?} not in top 3", rec.prompt);
	}
}

/// Sleeps inside `embed_batch`, flagging when the call starts and ends.
struct SlowEmbedder {
	inner: FakeEmbedder,
	started: Arc<AtomicBool>,
	finished: Arc<AtomicBool>,
}

impl Embedder for SlowEmbedder {
	fn id(&self) -> &str { self.inner.id() }
	fn dim(&self) -> usize { self.inner.dim() }
	fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
		self.started.store(true, Ordering::SeqCst);
		std::thread::sleep(Duration::from_millis(400));
		self.finished.store(true, Ordering::SeqCst);
		self.inner.embed_batch(texts)
	}
}

#[tokio::test]
async fn embedding_does_not_block_the_runtime() {
	let tmp = TempDir::new().expect("tmp");
	let csv = write_csv(tmp.path(), "faq.csv", FAQ);
	let cfg = settings(tmp.path());
	let started = Arc::new(AtomicBool::new(false));
	let finished = Arc::new(AtomicBool::new(false));
	let embedder = SlowEmbedder { inner: FakeEmbedder::new(64), started: started.clone(), finished: finished.clone() };
	let builder = KnowledgeBaseBuilder::new(Arc::new(embedder), cfg, SourceLoader::default());

	// single-threaded runtime: this task only runs if the build yields while embedding
	let build = tokio::spawn(async move { builder.build_index(&csv).await });
	while !started.load(Ordering::SeqCst) {
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert!(!finished.load(Ordering::SeqCst), "runtime was blocked for the whole embedding call");

	let report = build.await.expect("join").expect("build");
	assert_eq!(report.documents, 4);
}

#[tokio::test]
async fn k_larger_than_table_returns_all_rows() {
	let tmp = TempDir::new().expect("tmp");
	let csv = write_csv(tmp.path(), "faq.csv", FAQ);
	let cfg = settings(tmp.path());
	KnowledgeBaseBuilder::new(fake(), cfg.clone(), SourceLoader::default()).build_index(&csv).await.expect("build");
	let hits = Retriever::new(fake(), &cfg).retrieve("friends", 10).await.expect("retrieve");
	assert_eq!(hits.len(), 4);
	assert!(Retriever::new(fake(), &cfg).retrieve("friends", 0).await.expect("k=0").is_empty());
}

#[tokio::test]
async fn rebuild_replaces_instead_of_appending() {
	let tmp = TempDir::new().expect("tmp");
	let csv = write_csv(tmp.path(), "faq.csv", FAQ);
	let cfg = settings(tmp.path());
	let builder = KnowledgeBaseBuilder::new(fake(), cfg.clone(), SourceLoader::default());
	builder.build_index(&csv).await.expect("first build");
	let retriever = Retriever::new(fake(), &cfg);
	let first = retriever.retrieve("I miss my ex", 3).await.expect("first");

	builder.build_index(&csv).await.expect("second build");
	let second = retriever.retrieve("I miss my ex", 3).await.expect("second");
	let ids = |v: &[buddy_core::types::RetrievedDocument]| v.iter().map(|d| d.id.clone()).collect::<Vec<_>>();
	assert_eq!(ids(&first), ids(&second));

	let status = retriever.status().await.expect("status");
	assert_eq!(status.row_count, 4);
	assert_eq!(status.dim, 64);
	assert!(!staging_path(&cfg.path).exists());
}

#[tokio::test]
async fn query_before_build_reports_missing_index() {
	let tmp = TempDir::new().expect("tmp");
	let cfg = settings(tmp.path());
	let err = Retriever::new(fake(), &cfg).retrieve("hello", 3).await.unwrap_err();
	assert!(matches!(err, Error::IndexMissing(_)), "{err:?}");
	let err = Retriever::new(fake(), &cfg).retrieve("hello", 0).await.unwrap_err();
	assert!(matches!(err, Error::IndexMissing(_)), "{err:?}");
}

#[tokio::test]
async fn failed_rebuild_keeps_previous_index() {
	let tmp = TempDir::new().expect("tmp");
	let csv = write_csv(tmp.path(), "faq.csv", FAQ);
	let cfg = settings(tmp.path());
	KnowledgeBaseBuilder::new(fake(), cfg.clone(), SourceLoader::default()).build_index(&csv).await.expect("build");

	// missing source
	let err = KnowledgeBaseBuilder::new(fake(), cfg.clone(), SourceLoader::default())
		.build_index(&tmp.path().join("nope.csv"))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Load { .. }), "{err:?}");

	// embedder failure after staging started
	let err = KnowledgeBaseBuilder::new(Arc::new(BrokenEmbedder), cfg.clone(), SourceLoader::default())
		.build_index(&csv)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Upstream { service: "embedding", .. }), "{err:?}");
	assert!(!staging_path(&cfg.path).exists());

	let hits = Retriever::new(fake(), &cfg).retrieve("How do I make new friends", 3).await.expect("still queryable");
	assert_eq!(hits[0].id, "row:1");
}

#[tokio::test]
async fn dimension_mismatch_is_a_storage_error() {
	let tmp = TempDir::new().expect("tmp");
	let csv = write_csv(tmp.path(), "faq.csv", FAQ);
	let cfg = settings(tmp.path());
	KnowledgeBaseBuilder::new(fake(), cfg.clone(), SourceLoader::default()).build_index(&csv).await.expect("build");
	let err = Retriever::new(Arc::new(FakeEmbedder::new(32)), &cfg).retrieve("hi", 3).await.unwrap_err();
	assert!(matches!(err, Error::Storage(_)), "{err:?}");
}
