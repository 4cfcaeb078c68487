//! Re-framing of an upstream chat-completion event stream into the relay's
//! output format: one `{"model": ...}` line, then raw content text.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::models::api::ModelAnnouncement;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// In-band marker written in place of a fragment that could not be parsed.
pub const PARSE_ERROR_MARKER: &str = "\nError: Unable to parse response\n";

/// One output unit of the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayFrame {
    /// Control record naming the routed model. Emitted once, first.
    Model(String),
    /// A piece of generated text.
    Content(String),
    /// A stream line whose payload was not a valid completion fragment.
    ParseError,
}

impl RelayFrame {
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Model(model) => {
                let mut line = serde_json::to_string(&ModelAnnouncement { model })
                    .unwrap_or_else(|_| "{}".to_string());
                line.push('\n');
                Bytes::from(line)
            }
            Self::Content(text) => Bytes::from(text),
            Self::ParseError => Bytes::from_static(PARSE_ERROR_MARKER.as_bytes()),
        }
    }
}

#[derive(Deserialize)]
struct CompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionChunk {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|s| !s.is_empty())
    }
}

/// Incremental line decoder for `data: `-framed event streams.
///
/// Bytes are buffered until a `\n` completes a line, so lines (and multi-byte
/// characters) split across network reads are reassembled before parsing.
pub struct EventStreamDecoder {
    model: String,
    buffer: Vec<u8>,
    model_sent: bool,
    done: bool,
}

impl EventStreamDecoder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            buffer: Vec::new(),
            model_sent: false,
            done: false,
        }
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one network read, appending any frames it completes to `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<RelayFrame>) {
        if self.done {
            return;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.process_line(&line[..pos], out);
            if self.done {
                self.buffer.clear();
                return;
            }
        }
    }

    /// Signal upstream end of input. An incomplete trailing line is dropped.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            debug!(
                "Discarding {} bytes of incomplete trailing line",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    fn process_line(&mut self, raw: &[u8], out: &mut VecDeque<RelayFrame>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.strip_suffix('\r').unwrap_or(&line);

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        if payload == DONE_SENTINEL {
            self.done = true;
            return;
        }

        match serde_json::from_str::<CompletionChunk>(payload) {
            Ok(chunk) => {
                if !self.model_sent {
                    out.push_back(RelayFrame::Model(self.model.clone()));
                    self.model_sent = true;
                }
                if let Some(content) = chunk.into_content() {
                    out.push_back(RelayFrame::Content(content));
                }
            }
            Err(e) => {
                warn!("Error parsing stream fragment: {e}");
                out.push_back(RelayFrame::ParseError);
            }
        }
    }
}

/// Pull-based relay stream over an upstream byte stream.
///
/// Ends when the upstream sends `[DONE]` or closes. An upstream transport
/// error is yielded once and ends the stream.
pub struct RelayStream<S> {
    upstream: S,
    decoder: EventStreamDecoder,
    pending: VecDeque<RelayFrame>,
    finished: bool,
}

impl<S> RelayStream<S> {
    pub fn new(upstream: S, model: impl Into<String>) -> Self {
        Self {
            upstream,
            decoder: EventStreamDecoder::new(model),
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S> Stream for RelayStream<S>
where
    S: Stream<Item = anyhow::Result<Bytes>> + Unpin,
{
    type Item = anyhow::Result<RelayFrame>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.upstream.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    this.decoder.feed(&chunk, &mut this.pending);
                    if this.decoder.is_done() {
                        debug!("Upstream signalled end of stream");
                        this.finished = true;
                    }
                }
                Some(Err(e)) => {
                    error!("Upstream stream error: {e}");
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.decoder.finish();
                    this.finished = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn upstream(chunks: &[&str]) -> impl Stream<Item = anyhow::Result<Bytes>> + Unpin {
        let owned: Vec<anyhow::Result<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        stream::iter(owned)
    }

    async fn collect(chunks: &[&str]) -> Vec<RelayFrame> {
        RelayStream::new(upstream(chunks), "test-model")
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    fn content(text: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{text}\"}}}}]}}\n\n")
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let frames = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel",
            "lo\"}}]}\n\ndata: [DONE]\n\n",
        ])
        .await;
        assert_eq!(
            frames,
            vec![
                RelayFrame::Model("test-model".to_string()),
                RelayFrame::Content("Hello".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_end_stream() {
        let good = content("ok");
        let frames = collect(&["data: not-json\n", &good, "data: [DONE]\n"]).await;
        assert_eq!(
            frames,
            vec![
                RelayFrame::ParseError,
                RelayFrame::Model("test-model".to_string()),
                RelayFrame::Content("ok".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_model_announced_exactly_once() {
        let a = content("a");
        let b = content("b");
        let frames = collect(&[&a, &b]).await;
        let models = frames
            .iter()
            .filter(|f| matches!(f, RelayFrame::Model(_)))
            .count();
        assert_eq!(models, 1);
        assert_eq!(frames[0], RelayFrame::Model("test-model".to_string()));
        assert_eq!(frames.len(), 3);
    }

    #[tokio::test]
    async fn test_ignores_comments_and_empty_deltas() {
        let frames = collect(&[
            ": OPENROUTER PROCESSING\n\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            "data: {\"choices\":[]}\n",
        ])
        .await;
        assert_eq!(frames, vec![RelayFrame::Model("test-model".to_string())]);
    }

    #[tokio::test]
    async fn test_fragment_without_choices_is_malformed() {
        let frames = collect(&["data: {\"error\":{\"message\":\"overloaded\"}}\n"]).await;
        assert_eq!(frames, vec![RelayFrame::ParseError]);
    }

    #[tokio::test]
    async fn test_nothing_after_done() {
        let after = content("late");
        let frames = collect(&["data: [DONE]\n", &after]).await;
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let frames = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n\r\n",
            "data: [DONE]\r\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}\r\n",
        ])
        .await;
        assert_eq!(
            frames,
            vec![
                RelayFrame::Model("test-model".to_string()),
                RelayFrame::Content("x".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_incomplete_trailing_line_dropped_on_close() {
        let first = content("a");
        let frames = collect(&[&first, "data: {\"choices\":[{\"delta\":{\"content\":\"b"]).await;
        assert_eq!(
            frames,
            vec![
                RelayFrame::Model("test-model".to_string()),
                RelayFrame::Content("a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_reads() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('\u{e9}').unwrap() + 1;
        let parts: Vec<anyhow::Result<Bytes>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];
        let frames: Vec<RelayFrame> = RelayStream::new(stream::iter(parts), "m")
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(frames[1], RelayFrame::Content("caf\u{e9}".to_string()));
    }

    #[tokio::test]
    async fn test_upstream_error_ends_stream() {
        let first = content("a");
        let parts: Vec<anyhow::Result<Bytes>> = vec![
            Ok(Bytes::from(first)),
            Err(anyhow::anyhow!("connection reset")),
            Ok(Bytes::from(content("b"))),
        ];
        let results: Vec<anyhow::Result<RelayFrame>> =
            RelayStream::new(stream::iter(parts), "m").collect().await;
        assert_eq!(results.len(), 3);
        assert!(results[2].is_err());
    }

    #[test]
    fn test_frame_bytes() {
        assert_eq!(
            RelayFrame::Model("openchat/openchat-7b:free".to_string()).into_bytes(),
            Bytes::from("{\"model\":\"openchat/openchat-7b:free\"}\n")
        );
        assert_eq!(
            RelayFrame::Content("Hi".to_string()).into_bytes(),
            Bytes::from("Hi")
        );
        assert_eq!(
            RelayFrame::ParseError.into_bytes(),
            Bytes::from("\nError: Unable to parse response\n")
        );
    }
}
