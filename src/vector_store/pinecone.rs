use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::chunk::{ChunkRecord, ScoredChunk};
use crate::vector_store::VectorStore;

pub const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

/// Pinecone serverless index client using the data-plane HTTP API.
pub struct PineconeIndex {
    api_key: String,
    host: String,
    dimensions: usize,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [ChunkRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadataLoose>,
}

/// Metadata as read back; records written by other tools may lack `text`.
#[derive(Deserialize)]
struct ChunkMetadataLoose {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

fn with_scheme(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

impl PineconeIndex {
    pub fn new(api_key: &str, host: &str, dimensions: usize) -> Self {
        Self {
            api_key: api_key.to_string(),
            host: with_scheme(host),
            dimensions,
            http_client: reqwest::Client::new(),
        }
    }

    /// Connect to a named index, resolving its data-plane host from the control plane.
    pub async fn connect(
        api_key: &str,
        control_plane_url: &str,
        index_name: &str,
        dimensions: usize,
    ) -> anyhow::Result<Self> {
        let url = format!(
            "{}/indexes/{index_name}",
            control_plane_url.trim_end_matches('/')
        );
        let resp = reqwest::Client::new()
            .get(&url)
            .header("Api-Key", api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone describe index '{index_name}' failed ({status}): {body}");
        }

        let described: DescribeIndexResponse = resp.json().await?;
        info!("Resolved Pinecone index {index_name} -> {}", described.host);
        Ok(Self::new(api_key, &described.host, dimensions))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(format!("{}{path}", self.host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

#[async_trait]
impl VectorStore for PineconeIndex {
    async fn upsert(&self, records: &[ChunkRecord]) -> anyhow::Result<()> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != self.dimensions) {
            anyhow::bail!(
                "Record {} has {} dimensions, index expects {}",
                bad.id,
                bad.values.len(),
                self.dimensions
            );
        }

        let resp = self
            .post("/vectors/upsert")
            .json(&UpsertRequest { vectors: records })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone upsert failed ({status}): {body}");
        }

        let response: UpsertResponse = resp.json().await?;
        debug!("Pinecone upserted {} records", response.upserted_count);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<ScoredChunk>> {
        let resp = self
            .post("/query")
            .json(&QueryRequest {
                vector,
                top_k,
                include_metadata: true,
                include_values: false,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone query failed ({status}): {body}");
        }

        let response: QueryResponse = resp.json().await?;
        Ok(response
            .matches
            .into_iter()
            .map(|m| ScoredChunk {
                id: m.id,
                score: m.score,
                text: m.metadata.and_then(|md| md.text),
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
