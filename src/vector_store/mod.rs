pub mod pinecone;
pub mod utils;

use async_trait::async_trait;

use crate::models::chunk::{ChunkRecord, ScoredChunk};

/// Abstract vector index interface.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records keyed by id.
    async fn upsert(&self, records: &[ChunkRecord]) -> anyhow::Result<()>;

    /// Find the `top_k` nearest records, with their metadata text.
    async fn query(&self, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<ScoredChunk>>;

    /// Width every stored vector must have.
    fn dimensions(&self) -> usize;
}
