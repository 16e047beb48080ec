//! Error taxonomy shared by every provider.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP error: {}", describe_http(.0))]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("stream error: {0}")]
    Transport(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// Coarse classification used for logging and for deciding whether a
/// failure ends the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Establishing or maintaining the network stream failed.
    Connection,
    /// One frame's payload could not be parsed.
    Decode,
    /// The provider reported an error in its own payload.
    Provider,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Http(_)
            | ChatError::Status { .. }
            | ChatError::Transport(_)
            | ChatError::Client(_) => ErrorKind::Connection,
            ChatError::Json(_) | ChatError::Malformed(_) => ErrorKind::Decode,
            ChatError::Provider(_) | ChatError::UnknownModel(_) => ErrorKind::Provider,
        }
    }

    /// Decode failures are confined to their frame; the stream continues.
    pub fn is_frame_local(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;

/// The error text followed by each distinct cause, `outer: inner: root`.
pub fn with_sources(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn describe_http(err: &reqwest::Error) -> String {
    let message = with_sources(err);
    if err.is_timeout() && !message.contains("timed out") {
        format!("{message} (timed out)")
    } else {
        message
    }
}
