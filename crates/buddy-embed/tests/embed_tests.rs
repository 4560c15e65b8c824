use buddy_core::config::{EmbedBackend, EmbedSettings};
use buddy_embed::{build_embedder, FakeEmbedder};
use buddy_core::traits::Embedder;

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_separates_unrelated_texts() {
    let embedder = FakeEmbedder::new(384);
    let q = embedder.embed_one("I miss my ex").unwrap();
    let same = embedder.embed_one("prompt: I miss my ex").unwrap();
    let other = embedder.embed_one("How do I ask my crush out").unwrap();
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&q, &same) > dot(&q, &other));
}

#[test]
fn settings_select_fake_backend() {
    let settings = EmbedSettings { backend: EmbedBackend::Fake, fake_dim: 32, ..EmbedSettings::default() };
    let embedder = build_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 32);
    assert_eq!(embedder.id(), "fake:d32");
}

#[test]
fn missing_model_dir_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = EmbedSettings { model_dir: tmp.path().join("absent"), ..EmbedSettings::default() };
    if std::env::var("MODEL_DIR").is_ok() || std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() { return; }
    let err = build_embedder(&settings).err().expect("should fail without weights");
    assert!(err.to_string().contains("all-MiniLM-L6-v2"));
}

/// Needs the real weights under `models/all-MiniLM-L6-v2` (or `MODEL_DIR`):
/// `cargo test -p buddy-embed -- --ignored`
#[ignore]
#[test]
fn bert_embedder_produces_normalized_384_dim_vectors() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().to_path_buf();
    let settings = EmbedSettings { model_dir: root.join("models/all-MiniLM-L6-v2"), ..EmbedSettings::default() };
    let embedder = build_embedder(&settings).expect("model");
    let v = embedder.embed_one("I miss my ex").expect("embed");
    assert_eq!(v.len(), 384);
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3);
}
