/// Seam to the external embedding model.
///
/// Implementations own no store state and must be deterministic for identical
/// input within a store's lifetime.
pub trait Embedder: Send + Sync {
    /// Short identifier for logs, e.g. `hash:d384`.
    fn id(&self) -> &str;
    /// Output dimension the model claims to produce.
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}
