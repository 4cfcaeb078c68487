use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::embedding::EmbeddingModel;
use crate::vector_store::utils::fit_to_dimensions;
use crate::vector_store::VectorStore;

/// Supplies background text relevant to a query.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn relevant_context(&self, query: &str) -> anyhow::Result<String>;
}

/// Retrieves context from the same vector index the ingestion path writes to.
pub struct VectorContextRetriever {
    embedding_model: Arc<dyn EmbeddingModel>,
    vector_store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl VectorContextRetriever {
    pub fn new(
        embedding_model: Arc<dyn EmbeddingModel>,
        vector_store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self {
            embedding_model,
            vector_store,
            top_k,
        }
    }
}

#[async_trait]
impl ContextRetriever for VectorContextRetriever {
    /// Stored chunk texts of the nearest matches, best first, separated by blank lines.
    async fn relevant_context(&self, query: &str) -> anyhow::Result<String> {
        let embedding = self.embedding_model.embed(query).await?;
        let embedding = fit_to_dimensions(embedding, self.vector_store.dimensions());

        let matches = self.vector_store.query(&embedding, self.top_k).await?;
        for m in &matches {
            debug!("Context match {} score={:.4}", m.id, m.score);
        }

        Ok(matches
            .into_iter()
            .filter_map(|m| m.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
