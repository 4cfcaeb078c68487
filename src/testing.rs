//! In-memory doubles for the external collaborators, for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;

use crate::completion::{ByteStream, CompletionModel};
use crate::embedding::EmbeddingModel;
use crate::models::api::Message;
use crate::models::chunk::{ChunkRecord, ScoredChunk};
use crate::retrieval::ContextRetriever;
use crate::vector_store::VectorStore;

/// Serve `router` on an ephemeral local port; returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Embeds known texts to fixed vectors and anything else to `[len + 1, 1, 1]`.
#[derive(Default)]
pub struct FakeEmbeddingModel {
    vectors: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
    failing_once: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeEmbeddingModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn failing_once(self, text: &str) -> Self {
        self.failing_once.lock().unwrap().insert(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingModel for FakeEmbeddingModel {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing.contains(text) || self.failing_once.lock().unwrap().remove(text) {
            anyhow::bail!("embedding failed for {text:?}");
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![text.len() as f32 + 1.0, 1.0, 1.0]))
    }

    fn model_name(&self) -> &str {
        "fake-embedding"
    }
}

/// Records upserts in order; answers queries with canned matches.
pub struct FakeVectorStore {
    dimensions: usize,
    upserts: Mutex<Vec<ChunkRecord>>,
    failing_ids: HashSet<String>,
    matches: Vec<ScoredChunk>,
    queries: Mutex<Vec<(Vec<f32>, usize)>>,
}

impl FakeVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            upserts: Mutex::new(Vec::new()),
            failing_ids: HashSet::new(),
            matches: Vec::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub fn with_match(mut self, id: &str, score: f32, text: Option<&str>) -> Self {
        self.matches.push(ScoredChunk {
            id: id.to_string(),
            score,
            text: text.map(str::to_string),
        });
        self
    }

    pub fn upserts(&self) -> Vec<ChunkRecord> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<(Vec<f32>, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn upsert(&self, records: &[ChunkRecord]) -> anyhow::Result<()> {
        for record in records {
            if self.failing_ids.contains(&record.id) {
                anyhow::bail!("upsert rejected for {}", record.id);
            }
            self.upserts.lock().unwrap().push(record.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<ScoredChunk>> {
        self.queries.lock().unwrap().push((vector.to_vec(), top_k));
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Replays scripted body chunks, or fails the request outright.
pub struct FakeCompletionModel {
    chunks: Vec<String>,
    fail: bool,
    requests: Mutex<Vec<(String, Vec<Message>)>>,
}

impl FakeCompletionModel {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn requests(&self) -> Vec<(String, Vec<Message>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for FakeCompletionModel {
    async fn complete_stream(&self, model: &str, messages: &[Message]) -> anyhow::Result<ByteStream> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        if self.fail {
            anyhow::bail!("Chat completion API error (500 Internal Server Error): upstream down");
        }
        let chunks: Vec<anyhow::Result<Bytes>> = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.clone())))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Returns a fixed context and records the queries it was asked.
pub struct FakeRetriever {
    context: String,
    queries: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContextRetriever for FakeRetriever {
    async fn relevant_context(&self, query: &str) -> anyhow::Result<String> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.context.clone())
    }
}
