//! Mock agent for testing.
//!
//! Plays back a scripted sequence of frames through the same
//! [`snapshot_stream`] loop the real providers use, so tests at every layer
//! see identical accumulation and error handling without any HTTP.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tc_protocol::ChatDelta;
use tokio::time::sleep;

use crate::agent::{snapshot_stream, ChunkDecoder, Decoded, SnapshotStream, StreamingChatAgent};
use crate::error::{ChatError, Result};

/// One scripted frame.
#[derive(Debug, Clone, PartialEq)]
pub enum MockFrame {
    /// A single-channel text delta.
    Text { content: String },
    /// A dual-channel frame of content parts.
    Parts { parts: Vec<String> },
    /// A frame that decodes but carries nothing new.
    Empty,
    /// A frame whose payload cannot be decoded.
    Malformed { raw: String },
    /// An in-band provider error.
    Error { message: String },
    /// The connection drops.
    Disconnect { reason: String },
    /// Provider end marker; later frames are never read.
    End,
    /// Delay before next frame (for timing tests).
    Delay { ms: u64 },
}

/// Configuration for a mock agent.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub model: String,
    /// Sequence of frames to play for every prompt.
    pub frames: Vec<MockFrame>,
    /// Optional delay between each frame (ms).
    pub chunk_delay_ms: Option<u64>,
    /// When set, opening the connection fails with this reason.
    pub connect_error: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: "mock-model".to_string(),
            frames: Vec::new(),
            chunk_delay_ms: None,
            connect_error: None,
        }
    }
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames(mut self, frames: Vec<MockFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }

    pub fn with_connect_error(mut self, reason: impl Into<String>) -> Self {
        self.connect_error = Some(reason.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Agent that replays a [`MockConfig`].
#[derive(Debug, Clone)]
pub struct MockAgent {
    config: MockConfig,
}

impl MockAgent {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }
}

impl StreamingChatAgent for MockAgent {
    fn stream_chat(&self, _prompt: &str) -> SnapshotStream {
        let config = self.config.clone();
        let connect = async move {
            match config.connect_error {
                Some(reason) => Err(ChatError::Transport(reason)),
                None => Ok(frame_stream(config.frames, config.chunk_delay_ms)),
            }
        };
        snapshot_stream("mock", connect, MockDecoder)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn frame_stream(
    frames: Vec<MockFrame>,
    chunk_delay_ms: Option<u64>,
) -> impl Stream<Item = Result<MockFrame>> + Send + 'static {
    stream! {
        for frame in frames {
            // Apply inter-frame delay if configured
            if let Some(delay_ms) = chunk_delay_ms {
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match frame {
                MockFrame::Delay { ms } => sleep(Duration::from_millis(ms)).await,
                MockFrame::Disconnect { reason } => {
                    yield Err(ChatError::Transport(reason));
                    return;
                }
                other => yield Ok(other),
            }
        }
    }
}

struct MockDecoder;

impl ChunkDecoder for MockDecoder {
    type Frame = MockFrame;

    fn decode(&mut self, frame: MockFrame) -> Result<Decoded> {
        match frame {
            MockFrame::Text { content } => Ok(Decoded::Delta(ChatDelta::Response(content))),
            MockFrame::Parts { parts } => Ok(Decoded::Delta(ChatDelta::Parts(parts))),
            MockFrame::Empty => Ok(Decoded::Delta(ChatDelta::Empty)),
            MockFrame::Malformed { raw } => Err(ChatError::Malformed(raw)),
            MockFrame::Error { message } => Err(ChatError::Provider(message)),
            MockFrame::End => Ok(Decoded::End),
            // Consumed by the frame stream.
            MockFrame::Delay { .. } | MockFrame::Disconnect { .. } => Ok(Decoded::Skip),
        }
    }
}

/// Built-in test fixtures for common scenarios.
pub mod fixtures {
    use super::*;

    /// Single-channel reply streamed in chunks.
    pub fn streaming_text(chunks: &[&str]) -> MockConfig {
        let frames = chunks
            .iter()
            .map(|chunk| MockFrame::Text {
                content: (*chunk).to_string(),
            })
            .collect();

        MockConfig::new().with_frames(frames)
    }

    /// Dual-channel reply: thinking frames, then one frame that opens the
    /// answer, then further answer frames.
    pub fn thinking_then_answer(thinking: &[&str], answer: &[&str]) -> MockConfig {
        let mut frames: Vec<MockFrame> = thinking
            .iter()
            .map(|t| MockFrame::Parts {
                parts: vec![(*t).to_string()],
            })
            .collect();

        let mut answer = answer.iter();
        if let Some(first) = answer.next() {
            frames.push(MockFrame::Parts {
                parts: vec![String::new(), (*first).to_string()],
            });
        }
        frames.extend(answer.map(|a| MockFrame::Parts {
            parts: vec![(*a).to_string()],
        }));

        MockConfig::new().with_frames(frames)
    }

    /// Text followed by a provider error.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_frames(vec![
            MockFrame::Text {
                content: text_before.to_string(),
            },
            MockFrame::Error {
                message: error.to_string(),
            },
        ])
    }

    /// Connection that fails before any frame arrives.
    pub fn connection_refused(reason: &str) -> MockConfig {
        MockConfig::new().with_connect_error(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tc_protocol::ChatSnapshot;

    async fn collect(config: MockConfig) -> Vec<ChatSnapshot> {
        MockAgent::new(config).stream_chat("prompt").collect().await
    }

    fn text(s: &str) -> MockFrame {
        MockFrame::Text {
            content: s.to_string(),
        }
    }

    #[tokio::test]
    async fn single_channel_deltas_accumulate() {
        let snaps = collect(fixtures::streaming_text(&["Hello", " world"])).await;
        assert_eq!(
            snaps,
            vec![
                ChatSnapshot::response("Hello"),
                ChatSnapshot::response("Hello world"),
            ]
        );
    }

    #[tokio::test]
    async fn dual_channel_flips_on_multi_part_frame() {
        let config = MockConfig::new().with_frames(vec![
            MockFrame::Parts {
                parts: vec!["Let me think...".to_string()],
            },
            MockFrame::Parts {
                parts: vec![String::new(), "The answer is 4".to_string()],
            },
        ]);
        let snaps = collect(config).await;
        assert_eq!(
            snaps,
            vec![
                ChatSnapshot::new("Let me think...", ""),
                ChatSnapshot::new("Let me think...", "The answer is 4"),
            ]
        );
    }

    #[tokio::test]
    async fn connect_failure_yields_one_error_snapshot() {
        let snaps = collect(fixtures::connection_refused("connection refused")).await;
        assert_eq!(snaps.len(), 1);
        assert!(snaps[0].thinking.contains("connection refused"));
        assert!(snaps[0].response.contains("connection refused"));
    }

    #[tokio::test]
    async fn malformed_frame_is_skipped_silently() {
        let config = MockConfig::new().with_frames(vec![
            text("a"),
            text("b"),
            MockFrame::Malformed {
                raw: "{\"choices\":".to_string(),
            },
            text("c"),
            text("d"),
        ]);
        let snaps = collect(config).await;
        let responses: Vec<&str> = snaps.iter().map(|s| s.response.as_str()).collect();
        assert_eq!(responses, vec!["a", "ab", "abc", "abcd"]);
        assert!(snaps.iter().all(|s| s.thinking.is_empty()));
    }

    #[tokio::test]
    async fn error_mid_stream_keeps_prior_snapshots() {
        let snaps = collect(fixtures::error_mid_stream("Processing...", "Rate limited")).await;
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0], ChatSnapshot::response("Processing..."));
        assert_eq!(snaps[1], ChatSnapshot::error("provider error: Rate limited"));
    }

    #[tokio::test]
    async fn disconnect_ends_with_error_snapshot() {
        let config = MockConfig::new().with_frames(vec![
            text("partial"),
            MockFrame::Disconnect {
                reason: "connection reset".to_string(),
            },
            text("never"),
        ]);
        let snaps = collect(config).await;
        assert_eq!(snaps.len(), 2);
        assert!(snaps[1].response.contains("connection reset"));
    }

    #[tokio::test]
    async fn end_marker_stops_reading() {
        let config = MockConfig::new().with_frames(vec![text("done"), MockFrame::End, text("ignored")]);
        let snaps = collect(config).await;
        assert_eq!(snaps, vec![ChatSnapshot::response("done")]);
    }

    #[tokio::test]
    async fn empty_reply_still_yields_terminal_snapshot() {
        let snaps = collect(MockConfig::new()).await;
        assert_eq!(snaps, vec![ChatSnapshot::default()]);
    }

    #[tokio::test]
    async fn empty_frames_repeat_the_current_snapshot() {
        let config = MockConfig::new().with_frames(vec![text("x"), MockFrame::Empty]);
        let snaps = collect(config).await;
        assert_eq!(
            snaps,
            vec![ChatSnapshot::response("x"), ChatSnapshot::response("x")]
        );
    }

    #[tokio::test]
    async fn delays_do_not_emit() {
        let config = MockConfig::new()
            .with_frames(vec![text("a"), MockFrame::Delay { ms: 5 }, text("b")])
            .with_chunk_delay(1);
        let snaps = collect(config).await;
        assert_eq!(snaps.len(), 2);
    }

    #[tokio::test]
    async fn fixture_thinking_then_answer() {
        let config = fixtures::thinking_then_answer(&["step 1. ", "step 2."], &["Four", "."]);
        let snaps = collect(config).await;
        assert_eq!(snaps.len(), 4);
        assert_eq!(snaps[1], ChatSnapshot::new("step 1. step 2.", ""));
        assert_eq!(snaps[3], ChatSnapshot::new("step 1. step 2.", "Four."));
    }

    #[tokio::test]
    async fn agent_is_reusable_across_prompts() {
        let agent = MockAgent::new(fixtures::streaming_text(&["hi"]));
        let first: Vec<_> = agent.stream_chat("one").collect().await;
        let second: Vec<_> = agent.stream_chat("two").collect().await;
        assert_eq!(first, second);
        assert_eq!(agent.model_name(), "mock-model");
    }
}
