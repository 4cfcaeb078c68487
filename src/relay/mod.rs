pub mod stream;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::completion::{ByteStream, CompletionModel};
use crate::models::api::Message;
use crate::prompt::SystemPrompt;
use crate::retrieval::ContextRetriever;
use crate::selector::ModelSelector;

pub use stream::{RelayFrame, RelayStream};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Conversation must contain at least one message")]
    EmptyConversation,
    #[error("Latest message has no content")]
    EmptyQuery,
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Retrieval-augmented chat: context lookup, model routing, streamed completion.
pub struct ChatRelay {
    retriever: Arc<dyn ContextRetriever>,
    selector: Arc<ModelSelector>,
    completion_model: Arc<dyn CompletionModel>,
    prompt: SystemPrompt,
}

impl ChatRelay {
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        selector: Arc<ModelSelector>,
        completion_model: Arc<dyn CompletionModel>,
        prompt: SystemPrompt,
    ) -> Self {
        Self {
            retriever,
            selector,
            completion_model,
            prompt,
        }
    }

    /// Start relaying a reply to `conversation`. The last message is the query.
    ///
    /// Every step up to the upstream accepting the request runs before this
    /// returns, so upstream failures surface here rather than mid-stream.
    pub async fn relay(
        &self,
        conversation: Vec<Message>,
    ) -> Result<RelayStream<ByteStream>, ChatError> {
        let query = conversation
            .last()
            .map(|m| m.content.clone())
            .ok_or(ChatError::EmptyConversation)?;
        if query.trim().is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        info!("User message: {query}");

        let context = self.retriever.relevant_context(&query).await?;

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(self.prompt.message(&context));
        messages.extend(conversation);

        let model = self.selector.select_model(&query).await?;

        let upstream = self
            .completion_model
            .complete_stream(&model, &messages)
            .await?;

        Ok(RelayStream::new(upstream, model))
    }
}
