//! Embedding-similarity routing of a query to one of a fixed set of chat models.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedding::EmbeddingModel;

/// A chat model and the kind of request it is best at, in prose.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelCategory {
    pub model: String,
    pub category: String,
}

impl ModelCategory {
    pub fn new(model: &str, category: &str) -> Self {
        Self {
            model: model.to_string(),
            category: category.to_string(),
        }
    }
}

/// Cosine similarity `dot(a,b) / (|a||b|)`.
///
/// NaN when either vector has zero magnitude; NaN never wins a comparison, so
/// such a category is simply never selected.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Routes a query to the category whose description embeds closest to it.
pub struct ModelSelector {
    embedding_model: Arc<dyn EmbeddingModel>,
    categories: Vec<ModelCategory>,
    category_embeddings: OnceCell<Vec<Vec<f32>>>,
}

impl ModelSelector {
    pub fn new(
        embedding_model: Arc<dyn EmbeddingModel>,
        categories: Vec<ModelCategory>,
    ) -> anyhow::Result<Self> {
        if categories.is_empty() {
            anyhow::bail!("At least one model category is required");
        }
        Ok(Self {
            embedding_model,
            categories,
            category_embeddings: OnceCell::new(),
        })
    }

    pub fn categories(&self) -> &[ModelCategory] {
        &self.categories
    }

    /// Category embeddings, computed sequentially on first use and reused after.
    /// A failed computation leaves the cache empty so the next call retries.
    async fn category_embeddings(&self) -> anyhow::Result<&[Vec<f32>]> {
        let embeddings = self
            .category_embeddings
            .get_or_try_init(|| async {
                let mut out = Vec::with_capacity(self.categories.len());
                for category in &self.categories {
                    out.push(self.embedding_model.embed(&category.category).await?);
                }
                info!("Cached embeddings for {} model categories", out.len());
                Ok::<_, anyhow::Error>(out)
            })
            .await?;
        Ok(embeddings)
    }

    /// Pick the model for `query`. Ties keep the earliest-listed category.
    pub async fn select_model(&self, query: &str) -> anyhow::Result<String> {
        debug!("Selecting model for query: {query}");
        let query_embedding = self.embedding_model.embed(query).await?;
        let category_embeddings = self.category_embeddings().await?;

        let mut best_model = &self.categories[0].model;
        let mut best_similarity = f64::NEG_INFINITY;

        for (category, embedding) in self.categories.iter().zip(category_embeddings) {
            if embedding.len() != query_embedding.len() {
                anyhow::bail!(
                    "Embedding width mismatch for {}: query {} vs category {}",
                    category.model,
                    query_embedding.len(),
                    embedding.len()
                );
            }
            let similarity = cosine_similarity(&query_embedding, embedding);
            debug!("Similarity for {}: {similarity}", category.model);
            if similarity > best_similarity {
                best_model = &category.model;
                best_similarity = similarity;
            }
        }

        info!("Selected model: {best_model}");
        Ok(best_model.clone())
    }
}
