//! HTTP plumbing shared by the provider transports.

use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};

use crate::config::HttpConfig;
use crate::error::{ChatError, Result};
use crate::sse::{parse_line_stream, parse_sse_stream, SseEvent};

/// Build an HTTP client with connection and per-read timeouts.
///
/// No overall request timeout is set; a reply may stream for as long as
/// each read arrives within `read_timeout`.
pub fn build_http_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .pool_max_idle_per_host(2)
        .build()
        .map_err(|e| ChatError::Client(e.to_string()))
}

/// Send a streaming request and check the status.
pub async fn send_streaming(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Status { status, body });
    }

    Ok(response)
}

/// Open a request whose body is an SSE stream.
pub async fn open_sse(
    request: RequestBuilder,
) -> Result<impl Stream<Item = Result<SseEvent>> + Send + 'static> {
    let response = send_streaming(request).await?;
    Ok(parse_sse_stream(response.bytes_stream()).map(|r| r.map_err(ChatError::from)))
}

/// Open a request whose body is read line by line.
pub async fn open_lines(
    request: RequestBuilder,
) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
    let response = send_streaming(request).await?;
    Ok(parse_line_stream(response.bytes_stream()).map(|r| r.map_err(ChatError::from)))
}
