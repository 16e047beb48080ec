//! Together AI chat completions, decoded line by line.
//!
//! Together serves the OpenAI chunk format but this transport reads the
//! body as raw lines rather than SSE events: blank lines and non-`data:`
//! lines are skipped, `data: [DONE]` ends the stream, and every chunk that
//! parses produces a snapshot even when it adds no text.

use reqwest::Client;
use tc_protocol::ChatDelta;
use tracing::debug;

use crate::agent::{snapshot_stream, ChunkDecoder, Decoded, SnapshotStream, StreamingChatAgent};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::http::{build_http_client, open_lines};
use crate::openai::{ChatCompletionsRequest, CompletionChunk};
use crate::sse::{data_payload, DONE_MARKER};

pub const API_BASE: &str = "https://api.together.xyz/v1";
pub const DEFAULT_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful, friendly, and knowledgeable assistant.";

pub fn default_config() -> AgentConfig {
    AgentConfig::new(DEFAULT_MODEL, API_BASE)
        .with_system_prompt(DEFAULT_SYSTEM_PROMPT)
        .with_temperature(0.7)
        .with_max_tokens(1024)
}

/// Together AI chat agent.
pub struct TogetherAgent {
    api_key: String,
    config: AgentConfig,
    http: Client,
}

impl TogetherAgent {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, default_config())
    }

    pub fn with_config(api_key: impl Into<String>, config: AgentConfig) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            http: build_http_client(&config.http)?,
            config,
        })
    }
}

impl StreamingChatAgent for TogetherAgent {
    fn stream_chat(&self, prompt: &str) -> SnapshotStream {
        debug!(model = %self.config.model, "together request");
        let request = self
            .http
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionsRequest::new(&self.config, prompt));

        snapshot_stream("together", open_lines(request), DataLineDecoder)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Decodes `data: <json>` lines carrying chat-completion chunks.
#[derive(Debug, Default)]
pub struct DataLineDecoder;

impl ChunkDecoder for DataLineDecoder {
    type Frame = String;

    fn decode(&mut self, line: String) -> Result<Decoded> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Decoded::Skip);
        }

        let Some(payload) = data_payload(line) else {
            debug!(line, "ignoring non-data line");
            return Ok(Decoded::Skip);
        };
        if payload.trim() == DONE_MARKER {
            return Ok(Decoded::End);
        }

        let chunk: CompletionChunk = serde_json::from_str(payload)?;
        chunk.check_error()?;

        Ok(Decoded::Delta(match chunk.into_content() {
            Some(text) if !text.is_empty() => ChatDelta::Response(text),
            _ => ChatDelta::Empty,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;

    fn decode(line: &str) -> Result<Decoded> {
        DataLineDecoder.decode(line.to_string())
    }

    #[test]
    fn data_line_with_content() {
        let decoded = decode(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(decoded, Decoded::Delta(ChatDelta::Response("Hi".to_string())));
    }

    #[test]
    fn data_line_without_content_still_produces_a_snapshot() {
        let decoded = decode(r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(decoded, Decoded::Delta(ChatDelta::Empty));
    }

    #[test]
    fn blank_and_foreign_lines_are_skipped() {
        assert_eq!(decode("").unwrap(), Decoded::Skip);
        assert_eq!(decode("   ").unwrap(), Decoded::Skip);
        assert_eq!(decode(": keep-alive").unwrap(), Decoded::Skip);
        assert_eq!(decode("event: message").unwrap(), Decoded::Skip);
    }

    #[test]
    fn done_marker_ends_stream() {
        assert_eq!(decode("data: [DONE]").unwrap(), Decoded::End);
        assert_eq!(decode("data:[DONE]\r").unwrap(), Decoded::End);
    }

    #[test]
    fn truncated_json_is_frame_local() {
        let err = decode(r#"data: {"choices":[{"delta":{"cont"#).unwrap_err();
        assert!(err.is_frame_local());
    }

    #[test]
    fn error_chunk_is_provider_error() {
        let err = decode(r#"data: {"error":{"message":"model overloaded"}}"#).unwrap_err();
        assert!(matches!(err, ChatError::Provider(_)));
    }

    #[test]
    fn default_config_has_fixed_sampling_parameters() {
        let cfg = default_config();
        assert_eq!(cfg.temperature, Some(0.7));
        assert_eq!(cfg.max_tokens, Some(1024));
        let json = serde_json::to_value(ChatCompletionsRequest::new(&cfg, "q")).unwrap();
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["content"], DEFAULT_SYSTEM_PROMPT);
    }
}
