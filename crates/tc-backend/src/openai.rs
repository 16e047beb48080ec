//! OpenAI chat completions with SSE streaming.
//!
//! The chunk types and decoder here are shared by the other providers that
//! speak the same wire format (OpenRouter, Together).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tc_protocol::ChatDelta;
use tracing::debug;

use crate::agent::{snapshot_stream, ChunkDecoder, Decoded, SnapshotStream, StreamingChatAgent};
use crate::config::AgentConfig;
use crate::error::{ChatError, Result};
use crate::http::{build_http_client, open_sse};
use crate::sse::SseEvent;

pub const API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

pub fn default_config() -> AgentConfig {
    AgentConfig::new(DEFAULT_MODEL, API_BASE).with_system_prompt(DEFAULT_SYSTEM_PROMPT)
}

/// OpenAI chat agent.
pub struct OpenAiAgent {
    api_key: String,
    config: AgentConfig,
    http: Client,
}

impl OpenAiAgent {
    /// Create an agent with the default model and parameters.
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

impl StreamingChatAgent for OpenAiAgent {
    fn stream_chat(&self, prompt: &str) -> SnapshotStream {
        debug!(model = %self.config.model, "openai request");
        let request = self
            .http
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionsRequest::new(&self.config, prompt));

        snapshot_stream("openai", open_sse(request), ChatCompletionsDecoder)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Decodes chat-completion chunks delivered as SSE events.
///
/// `data: [DONE]` ends the stream. Chunks without content (role headers,
/// finish reasons, usage) produce nothing.
#[derive(Debug, Default)]
pub struct ChatCompletionsDecoder;

impl ChunkDecoder for ChatCompletionsDecoder {
    type Frame = SseEvent;

    fn decode(&mut self, event: SseEvent) -> Result<Decoded> {
        if event.is_done_marker() {
            return Ok(Decoded::End);
        }

        let chunk: CompletionChunk = serde_json::from_str(&event.data)?;
        chunk.check_error()?;

        Ok(match chunk.into_content() {
            Some(text) if !text.is_empty() => Decoded::Delta(ChatDelta::Response(text)),
            _ => Decoded::Skip,
        })
    }
}

// Wire types

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatCompletionsRequest<'a> {
    pub(crate) fn new(config: &'a AgentConfig, prompt: &'a str) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = config.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        Self {
            model: &config.model,
            messages,
            stream: true,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl CompletionChunk {
    /// Fail if the chunk carries an in-band error object.
    pub(crate) fn check_error(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(ChatError::Provider(err.message.clone())),
            None => Ok(()),
        }
    }

    /// Content delta of the first choice, if any.
    pub(crate) fn into_content(self) -> Option<String> {
        self.choices.into_iter().next()?.delta.content
    }
}
