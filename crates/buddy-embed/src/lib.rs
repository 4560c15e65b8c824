//! Sentence embeddings for the FAQ index.
//!
//! `BertEmbedder` runs `sentence-transformers/all-MiniLM-L6-v2` locally through
//! candle. `FakeEmbedder` is a deterministic hashed bag-of-words used by tests
//! and offline development (`APP_USE_FAKE_EMBEDDINGS=1`).

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::Device;
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use buddy_core::config::{EmbedBackend, EmbedSettings};
use buddy_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;
use tokenize::tokenize_on_device;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl BertEmbedder {
    /// Load `config.json`, `tokenizer.json` and the weights
    /// (`model.safetensors`, else `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, &device)? }
        } else {
            VarBuilder::from_pth(model_dir.join("pytorch_model.bin"), DTYPE, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        let name = model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "bert".to_string());
        let id = format!("bert:{name}:d{dim}");
        info!(%id, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, id })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != self.dim {
            return Err(anyhow!("model produced {} dims, expected {}", emb.len(), self.dim));
        }
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Deterministic hashed bag-of-words vectors; identical texts map to identical vectors.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:d{dim}") } }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        } else {
            // Empty text still needs a unit vector for cosine search.
            v[0] = 1.0;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder selected by the settings. `APP_USE_FAKE_EMBEDDINGS=1`
/// forces the fake embedder regardless of `embed.backend`.
pub fn build_embedder(settings: &EmbedSettings) -> Result<Arc<dyn Embedder>> {
    if settings.backend == EmbedBackend::Fake || fake_requested_by_env() {
        warn!(dim = settings.fake_dim, "using FakeEmbedder; retrieval quality is not meaningful");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let dir = resolve_model_dir(&settings.model_dir)?;
    Ok(Arc::new(BertEmbedder::load(&dir, settings.max_len)?))
}

fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    if configured.exists() { return Ok(configured.to_path_buf()); }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() { info!(dir = %p.display(), "using MODEL_DIR"); return Ok(p); }
    }
    Err(anyhow!(
        "Could not locate embedding model directory {} (download sentence-transformers/all-MiniLM-L6-v2 there or set MODEL_DIR)",
        configured.display()
    ))
}
