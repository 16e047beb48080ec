//! Anthropic Messages API with SSE streaming.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tc_protocol::ChatDelta;
use tracing::debug;

use crate::agent::{snapshot_stream, ChunkDecoder, Decoded, SnapshotStream, StreamingChatAgent};
use crate::config::AgentConfig;
use crate::error::{ChatError, Result};
use crate::http::{build_http_client, open_sse};
use crate::sse::SseEvent;

pub const API_BASE: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub fn default_config() -> AgentConfig {
    AgentConfig::new(DEFAULT_MODEL, API_BASE).with_max_tokens(DEFAULT_MAX_TOKENS)
}

/// Anthropic chat agent.
pub struct AnthropicAgent {
    api_key: String,
    config: AgentConfig,
    http: Client,
}

impl AnthropicAgent {
    /// Create an agent with the default model.
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

impl StreamingChatAgent for AnthropicAgent {
    fn stream_chat(&self, prompt: &str) -> SnapshotStream {
        debug!(model = %self.config.model, "anthropic request");
        let request = self
            .http
            .post(self.config.endpoint("v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&ApiRequest::new(&self.config, prompt));

        snapshot_stream("anthropic", open_sse(request), MessageEventDecoder)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Decodes typed Messages API events.
///
/// Only text deltas carry content. Lifecycle events (`message_start`,
/// `content_block_start`, `content_block_stop`, `ping`) and delta kinds
/// other than text produce nothing.
#[derive(Debug, Default)]
pub struct MessageEventDecoder;

impl ChunkDecoder for MessageEventDecoder {
    type Frame = SseEvent;

    fn decode(&mut self, event: SseEvent) -> Result<Decoded> {
        let data: Value = serde_json::from_str(&event.data)?;

        // The `event:` line and the payload's `type` agree; prefer the line.
        let event_type = event
            .event_type
            .as_deref()
            .or_else(|| data.get("type").and_then(Value::as_str))
            .unwrap_or("");

        match event_type {
            "content_block_delta" | "message_delta" => {
                match data.pointer("/delta/text").and_then(Value::as_str) {
                    Some(text) if !text.is_empty() => {
                        Ok(Decoded::Delta(ChatDelta::Response(text.to_string())))
                    }
                    _ => Ok(Decoded::Skip),
                }
            }
            "message_stop" => Ok(Decoded::End),
            "error" => {
                let message = data
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error");
                Err(ChatError::Provider(message.to_string()))
            }
            other => {
                debug!(event_type = other, "ignoring event");
                Ok(Decoded::Skip)
            }
        }
    }
}

// API request types

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ApiRequest<'a> {
    fn new(config: &'a AgentConfig, prompt: &'a str) -> Self {
        Self {
            model: &config.model,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream: true,
            system: config.system_prompt.as_deref(),
            temperature: config.temperature,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}
