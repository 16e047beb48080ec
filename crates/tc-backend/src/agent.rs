//! The streaming chat contract and the producer loop shared by all providers.
//!
//! Every provider splits into a transport (a future that opens the
//! connection and resolves to a stream of raw frames) and a
//! [`ChunkDecoder`] that turns one frame into a [`ChatDelta`].
//! [`snapshot_stream`] joins the two: it pulls frames in arrival order,
//! folds deltas into a [`StreamState`], and yields one cumulative
//! [`ChatSnapshot`] per decoded frame.
//!
//! Failures never surface as `Err` to the caller. A connection, transport or
//! provider error produces one final snapshot with the error text in both
//! channels; a frame that fails to decode is logged and skipped.

use std::future::Future;
use std::pin::Pin;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tc_protocol::{ChatDelta, ChatSnapshot, StreamPhase};
use tracing::{debug, warn};

use crate::error::{ChatError, Result};

/// Boxed sequence of snapshots returned by [`StreamingChatAgent::stream_chat`].
pub type SnapshotStream = Pin<Box<dyn Stream<Item = ChatSnapshot> + Send>>;

/// A chat model behind one provider's streaming API.
///
/// Agents hold only immutable configuration, so one agent may serve any
/// number of sequential or concurrent calls. Each call to `stream_chat`
/// opens a new connection; dropping the returned stream closes it.
pub trait StreamingChatAgent: Send + Sync {
    /// Stream a reply to `prompt` as cumulative snapshots.
    ///
    /// The stream is finite and always ends with exactly one terminal
    /// snapshot: the last decoded state, or an error snapshot.
    fn stream_chat(&self, prompt: &str) -> SnapshotStream;

    /// Identifier of the model this agent is bound to.
    fn model_name(&self) -> &str;
}

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// New content; produces a snapshot.
    Delta(ChatDelta),
    /// Frame carried nothing of interest (keep-alive, metadata, unknown type).
    Skip,
    /// Provider signalled end of stream.
    End,
}

/// Converts a provider's raw frames into deltas.
pub trait ChunkDecoder: Send {
    type Frame: Send;

    fn decode(&mut self, frame: Self::Frame) -> Result<Decoded>;
}

/// Cumulative state of one stream. Created per call, never shared.
#[derive(Debug, Default)]
pub struct StreamState {
    thinking: String,
    response: String,
    phase: StreamPhase,
    emitted: usize,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Fold one delta into the cumulative text.
    ///
    /// `Parts` deltas drive the thinking/response split: while in the
    /// thinking phase the first part of each frame extends `thinking`; the
    /// first frame with more than one part sends the remaining parts to
    /// `response` and moves to the response phase for good.
    pub fn apply(&mut self, delta: ChatDelta) {
        if self.phase.is_terminal() {
            return;
        }

        match delta {
            ChatDelta::Empty => {}
            ChatDelta::Response(text) => {
                self.phase = StreamPhase::Response;
                self.response.push_str(&text);
            }
            ChatDelta::Parts(parts) => {
                let mut parts = parts.into_iter();
                if self.phase == StreamPhase::Thinking {
                    if let Some(first) = parts.next() {
                        self.thinking.push_str(&first);
                    }
                    let mut rest = parts.peekable();
                    if rest.peek().is_some() {
                        self.phase = StreamPhase::Response;
                        rest.for_each(|p| self.response.push_str(&p));
                    }
                } else {
                    parts.for_each(|p| self.response.push_str(&p));
                }
            }
        }
    }

    /// Snapshot the current text and count it as emitted.
    pub fn emit(&mut self) -> ChatSnapshot {
        self.emitted += 1;
        ChatSnapshot::new(self.thinking.clone(), self.response.clone())
    }

    /// Mark the stream done. Returns a snapshot only if nothing has been
    /// emitted yet, so even an empty reply ends with one snapshot.
    pub fn finish(&mut self) -> Option<ChatSnapshot> {
        if self.phase.is_terminal() {
            return None;
        }
        let last = (self.emitted == 0).then(|| self.emit());
        self.phase = StreamPhase::Done;
        last
    }

    /// Mark the stream failed and build the error snapshot.
    pub fn fail(&mut self, err: &ChatError) -> ChatSnapshot {
        self.phase = StreamPhase::Failed;
        self.emitted += 1;
        ChatSnapshot::error(err)
    }
}

/// Drive one provider stream to completion as a snapshot stream.
///
/// `connect` opens the connection and resolves to the raw frame stream.
/// Nothing happens until the returned stream is first polled.
pub fn snapshot_stream<C, S, D>(provider: &'static str, connect: C, mut decoder: D) -> SnapshotStream
where
    C: Future<Output = Result<S>> + Send + 'static,
    S: Stream<Item = Result<D::Frame>> + Send + 'static,
    D: ChunkDecoder + 'static,
{
    Box::pin(stream! {
        let mut state = StreamState::new();

        let frames = match connect.await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(provider, kind = ?e.kind(), error = %e, "failed to open stream");
                yield state.fail(&e);
                return;
            }
        };
        let mut frames = std::pin::pin!(frames);

        while let Some(frame) = frames.next().await {
            match frame.and_then(|f| decoder.decode(f)) {
                Ok(Decoded::Delta(delta)) => {
                    state.apply(delta);
                    yield state.emit();
                }
                Ok(Decoded::Skip) => {}
                Ok(Decoded::End) => {
                    debug!(provider, "end marker received");
                    break;
                }
                Err(e) if e.is_frame_local() => {
                    warn!(provider, error = %e, "skipping undecodable frame");
                }
                Err(e) => {
                    warn!(provider, kind = ?e.kind(), error = %e, "stream failed");
                    yield state.fail(&e);
                    return;
                }
            }
        }

        if let Some(last) = state.finish() {
            yield last;
        }
    })
}
