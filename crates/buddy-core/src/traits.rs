use std::future::Future;

/// Text to vector. Implementations must return L2-normalized vectors of
/// length `dim()` and be deterministic for a given `id()`.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model, stored with the index.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Remote text generation.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = anyhow::Result<String>> + Send;
}
