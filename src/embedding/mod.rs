pub mod huggingface;

use async_trait::async_trait;

/// Abstract embedding model interface.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a single text. Vector length is provider-defined.
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Return the model identifier, for logging.
    fn model_name(&self) -> &str;
}
