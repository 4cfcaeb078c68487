use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingModel;

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/hf-inference";

/// Hugging Face Inference feature-extraction model via API.
pub struct HuggingFaceEmbeddingModel {
    model_name: String,
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

/// Sentence-level models return one vector; token-level models return one per token.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Pooled(Vec<f32>),
    PerToken(Vec<Vec<f32>>),
}

impl FeatureExtractionResponse {
    fn into_embedding(self) -> anyhow::Result<Vec<f32>> {
        match self {
            Self::Pooled(v) => Ok(v),
            Self::PerToken(tokens) => mean_pool(&tokens),
        }
    }
}

/// Average per-token vectors into a single vector.
fn mean_pool(tokens: &[Vec<f32>]) -> anyhow::Result<Vec<f32>> {
    let width = tokens
        .first()
        .map(|t| t.len())
        .ok_or_else(|| anyhow::anyhow!("Feature extraction returned no token vectors"))?;

    let mut sum = vec![0.0f32; width];
    for token in tokens {
        if token.len() != width {
            anyhow::bail!(
                "Ragged token vectors: expected width {width}, got {}",
                token.len()
            );
        }
        for (acc, x) in sum.iter_mut().zip(token) {
            *acc += x;
        }
    }

    let n = tokens.len() as f32;
    Ok(sum.into_iter().map(|x| x / n).collect())
}

impl HuggingFaceEmbeddingModel {
    pub fn new(model_name: &str, api_key: &str, base_url: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.base_url, self.model_name
        )
    }
}

#[async_trait]
impl EmbeddingModel for HuggingFaceEmbeddingModel {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let resp = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&FeatureExtractionRequest { inputs: text })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Hugging Face embedding API error ({status}): {body}");
        }

        let response: FeatureExtractionResponse = resp.json().await?;
        response.into_embedding()
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
