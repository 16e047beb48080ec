//! Line and Server-Sent Events (SSE) framing over a byte stream.
//!
//! [`LineStream`] splits raw bytes into lines. [`SseStream`] groups those
//! lines into events following the W3C EventSource parsing rules. Providers that
//! frame their stream as bare `data:` lines consume [`LineStream`] directly.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

/// Literal payload some providers send as their final `data:` line.
pub const DONE_MARKER: &str = "[DONE]";

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The event type (from `event:` field). None if not specified.
    pub event_type: Option<String>,
    /// The event data (from `data:` field(s)).
    pub data: String,
}

impl SseEvent {
    pub fn is_done_marker(&self) -> bool {
        self.data.trim() == DONE_MARKER
    }
}

/// Return the payload of a `data:` line, or `None` for any other line.
pub fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Splits a byte stream into `\n`-terminated lines.
///
/// Bytes are buffered until a full line is available, so a multi-byte
/// UTF-8 sequence split across chunks still decodes intact. A trailing
/// `\r` is stripped. An unterminated final line is emitted at end of stream.
pub struct LineStream<S> {
    inner: S,
    buf: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> LineStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        let scan_from = self.buf.len();
        self.buf.extend_from_slice(bytes);

        let mut start = 0;
        for i in scan_from..self.buf.len() {
            if self.buf[i] == b'\n' {
                let mut end = i;
                if end > start && self.buf[end - 1] == b'\r' {
                    end -= 1;
                }
                self.pending
                    .push_back(String::from_utf8_lossy(&self.buf[start..end]).into_owned());
                start = i + 1;
            }
        }
        self.buf.drain(..start);
    }

    fn flush_tail(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let mut tail = std::mem::take(&mut self.buf);
        if tail.last() == Some(&b'\r') {
            tail.pop();
        }
        self.pending
            .push_back(String::from_utf8_lossy(&tail).into_owned());
    }
}

impl<S, E> Stream for LineStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<String, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(line) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.push_bytes(&bytes),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    this.finished = true;
                    this.flush_tail();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Parser state for SSE stream.
#[derive(Default)]
struct SseParserState {
    /// Current event being accumulated
    current_event_type: Option<String>,
    /// Current data lines being accumulated
    current_data: Vec<String>,
}

impl SseParserState {
    /// Process a complete line. Returns an event if one is complete.
    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        // Empty line signals end of event
        if line.is_empty() {
            return self.take_event();
        }

        // A line without a colon names a field with an empty value. Lines
        // starting with a colon are comments, which fall through as the
        // unnamed field.
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "event" => self.current_event_type = Some(value.to_string()),
            "data" => self.current_data.push(value.to_string()),
            // id, retry and unknown fields
            _ => {}
        }

        None
    }

    fn take_event(&mut self) -> Option<SseEvent> {
        if self.current_data.is_empty() {
            self.current_event_type = None;
            return None;
        }

        let event = SseEvent {
            event_type: self.current_event_type.take(),
            data: self.current_data.join("\n"),
        };
        self.current_data.clear();
        Some(event)
    }
}

/// Stream wrapper that parses SSE events from a byte stream.
pub struct SseStream<S> {
    lines: LineStream<S>,
    state: SseParserState,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            lines: LineStream::new(inner),
            state: SseParserState::default(),
        }
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<SseEvent, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            match Pin::new(&mut this.lines).poll_next(cx) {
                Poll::Ready(Some(Ok(line))) => {
                    if let Some(event) = this.state.process_line(&line) {
                        return Poll::Ready(Some(Ok(event)));
                    }
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                // Dispatch whatever was accumulated when the body ends
                // without a trailing blank line.
                Poll::Ready(None) => return Poll::Ready(this.state.take_event().map(Ok)),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Create an SSE stream from a byte stream.
pub fn parse_sse_stream<S, E>(stream: S) -> SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    SseStream::new(stream)
}

/// Create a line stream from a byte stream.
pub fn parse_line_stream<S, E>(stream: S) -> LineStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    LineStream::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn bytes_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        futures::stream::iter(chunks.into_iter().map(|s| Ok(Bytes::from_static(s))))
    }

    #[tokio::test]
    async fn parse_simple_event() {
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data: hello\n\n"]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.event_type, None);
        assert_eq!(event.data, "hello");
        assert!(sse.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_event_with_type() {
        let mut sse = parse_sse_stream(bytes_stream(vec![
            b"event: content_block_delta\ndata: {}\n\n",
        ]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.event_type.as_deref(), Some("content_block_delta"));
        assert_eq!(event.data, "{}");
    }

    #[tokio::test]
    async fn parse_multi_line_data() {
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data: line1\ndata: line2\n\n"]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.data, "line1\nline2");
    }

    #[tokio::test]
    async fn parse_chunked_data() {
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data: hel", b"lo wor", b"ld\n\n"]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.data, "hello world");
    }

    #[tokio::test]
    async fn multibyte_char_split_across_chunks() {
        // "é" is 0xC3 0xA9
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data: caf\xC3", b"\xA9\n\n"]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.data, "café");
    }

    #[tokio::test]
    async fn parse_with_crlf() {
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data: hello\r\n\r\n"]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.data, "hello");
    }

    #[tokio::test]
    async fn ignore_comments_and_unknown_fields() {
        let mut sse = parse_sse_stream(bytes_stream(vec![
            b": keep-alive\nid: 7\nretry: 5000\ndata: actual\n\n",
        ]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.data, "actual");
        assert!(sse.next().await.is_none());
    }

    #[tokio::test]
    async fn bare_data_field_is_an_empty_entry() {
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data\n\ndata\ndata: x\n\n"]));

        let first = sse.next().await.unwrap().unwrap();
        assert_eq!(first.data, "");
        let second = sse.next().await.unwrap().unwrap();
        assert_eq!(second.data, "\nx");
        assert!(sse.next().await.is_none());
    }

    #[tokio::test]
    async fn event_type_without_data_is_dropped() {
        let mut sse = parse_sse_stream(bytes_stream(vec![
            b"event: ping\n\ndata: after\n\n",
        ]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.event_type, None);
        assert_eq!(event.data, "after");
    }

    #[tokio::test]
    async fn event_at_stream_end_without_trailing_newline() {
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data: final"]));

        let event = sse.next().await.unwrap().unwrap();
        assert_eq!(event.data, "final");
        assert!(sse.next().await.is_none());
    }

    #[tokio::test]
    async fn done_marker_detected() {
        let mut sse = parse_sse_stream(bytes_stream(vec![b"data: [DONE]\n\n"]));

        let event = sse.next().await.unwrap().unwrap();
        assert!(event.is_done_marker());
    }

    #[tokio::test]
    async fn line_stream_keeps_blank_lines() {
        let lines: Vec<String> = parse_line_stream(bytes_stream(vec![b"a\n\nb\r\nc"]))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["a", "", "b", "c"]);
    }

    #[tokio::test]
    async fn line_stream_propagates_errors() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"ok\n")),
            Err(std::io::Error::other("reset")),
        ];
        let mut lines = parse_line_stream(futures::stream::iter(chunks));

        assert_eq!(lines.next().await.unwrap().unwrap(), "ok");
        assert!(lines.next().await.unwrap().is_err());
    }

    #[test]
    fn data_payload_strips_prefix() {
        assert_eq!(data_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload("data:[DONE]"), Some("[DONE]"));
        assert_eq!(data_payload("event: x"), None);
        assert_eq!(data_payload(""), None);
    }
}
