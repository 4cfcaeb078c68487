pub mod openai;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::models::api::Message;

/// Raw response body of a streaming completion, as it arrives off the wire.
pub type ByteStream = BoxStream<'static, anyhow::Result<Bytes>>;

/// Abstract chat-completion interface.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Start a streaming completion against `model`.
    ///
    /// Resolves once the upstream has accepted the request; a non-success
    /// status is an error here, before any body bytes are handed out.
    async fn complete_stream(&self, model: &str, messages: &[Message]) -> anyhow::Result<ByteStream>;
}
