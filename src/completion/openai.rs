use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Serialize;

use super::{ByteStream, CompletionModel};
use crate::models::api::Message;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenAI-compatible chat-completion client (OpenRouter by default).
pub struct OpenAICompletionModel {
    base_url: String,
    api_key: String,
    referer: Option<String>,
    title: Option<String>,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

impl OpenAICompletionModel {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            referer: None,
            title: None,
            http_client: reqwest::Client::new(),
        }
    }

    /// Attribution headers OpenRouter uses for app rankings.
    pub fn with_attribution(mut self, referer: Option<String>, title: Option<String>) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    async fn complete_stream(&self, model: &str, messages: &[Message]) -> anyhow::Result<ByteStream> {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };

        let mut builder = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            builder = builder.header("X-Title", title);
        }

        let resp = builder.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion API error ({status}): {body}");
        }

        Ok(Box::pin(resp.bytes_stream().map_err(anyhow::Error::from)))
    }
}
