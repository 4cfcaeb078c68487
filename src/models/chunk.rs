use serde::{Deserialize, Serialize};

/// A blank-line-delimited segment of an uploaded document, before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
}

impl Chunk {
    /// Position-based record id, `chunk-<index>`.
    pub fn record_id(&self) -> String {
        format!("chunk-{}", self.index)
    }

    /// Convert to a ChunkRecord with an already width-fitted embedding.
    pub fn to_record(self, values: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            id: self.record_id(),
            values,
            metadata: ChunkMetadata { text: self.content },
        }
    }
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub text: String,
}

/// Represents a chunk written to the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A match returned by a vector index query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub score: f32,
    /// Absent when the record was written without a `text` metadata field.
    pub text: Option<String>,
}
