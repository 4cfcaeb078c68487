use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::embedding::EmbeddingModel;
use crate::parser::split_paragraphs;
use crate::vector_store::utils::fit_to_dimensions;
use crate::vector_store::VectorStore;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Embedding failed for chunk {index} ({written} chunks already stored): {source}")]
    Embedding {
        index: usize,
        written: usize,
        #[source]
        source: anyhow::Error,
    },
    #[error("Upsert failed for chunk {index} ({written} chunks already stored): {source}")]
    Upsert {
        index: usize,
        written: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl IngestError {
    /// Chunks written before the failure. They are not rolled back.
    pub fn written(&self) -> usize {
        match self {
            Self::Embedding { written, .. } | Self::Upsert { written, .. } => *written,
        }
    }
}

/// Chunks, embeds and stores documents, one chunk at a time.
pub struct Ingestor {
    embedding_model: Arc<dyn EmbeddingModel>,
    vector_store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(embedding_model: Arc<dyn EmbeddingModel>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding_model,
            vector_store,
        }
    }

    /// Ingest plain text. Returns the number of chunks stored.
    ///
    /// The first failing chunk aborts the rest.
    pub async fn ingest_text(&self, text: &str) -> Result<usize, IngestError> {
        let chunks = split_paragraphs(text);
        let total = chunks.len();
        let dimensions = self.vector_store.dimensions();

        for (written, chunk) in chunks.into_iter().enumerate() {
            let index = chunk.index;
            let embedding = self
                .embedding_model
                .embed(&chunk.content)
                .await
                .map_err(|source| IngestError::Embedding {
                    index,
                    written,
                    source,
                })?;

            let record = chunk.to_record(fit_to_dimensions(embedding, dimensions));
            self.vector_store
                .upsert(std::slice::from_ref(&record))
                .await
                .map_err(|source| IngestError::Upsert {
                    index,
                    written,
                    source,
                })?;

            info!("Uploaded chunk {} of {total}", index + 1);
        }

        Ok(total)
    }
}
