//! Google Gemini `streamGenerateContent` over SSE.
//!
//! Thinking models return reasoning and answer as separate content parts.
//! Each frame's parts are passed through unchanged as a
//! [`ChatDelta::Parts`]; the split into thinking and response is made by
//! the stream state, which treats the first frame with more than one part
//! as the start of the answer. That boundary is inferred from observed
//! framing rather than documented by the API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tc_protocol::ChatDelta;
use tracing::debug;

use crate::agent::{snapshot_stream, ChunkDecoder, Decoded, SnapshotStream, StreamingChatAgent};
use crate::config::AgentConfig;
use crate::error::{ChatError, Result};
use crate::http::{build_http_client, open_sse};
use crate::sse::SseEvent;

pub const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-thinking-exp";

pub fn default_config() -> AgentConfig {
    AgentConfig::new(DEFAULT_MODEL, API_BASE)
}

/// Gemini chat agent.
pub struct GeminiAgent {
    api_key: String,
    config: AgentConfig,
    http: Client,
}

impl GeminiAgent {
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

    fn stream_url(&self) -> String {
        self.config.endpoint(&format!(
            "models/{}:streamGenerateContent?alt=sse",
            self.config.model
        ))
    }
}

impl StreamingChatAgent for GeminiAgent {
    fn stream_chat(&self, prompt: &str) -> SnapshotStream {
        debug!(model = %self.config.model, "gemini request");
        let request = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest::new(&self.config, prompt));

        snapshot_stream("gemini", open_sse(request), ContentPartsDecoder)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Decodes `GenerateContentResponse` frames into part lists.
#[derive(Debug, Default)]
pub struct ContentPartsDecoder;

impl ChunkDecoder for ContentPartsDecoder {
    type Frame = SseEvent;

    fn decode(&mut self, event: SseEvent) -> Result<Decoded> {
        let frame: GenerateContentResponse = serde_json::from_str(&event.data)?;

        if let Some(err) = frame.error {
            return Err(ChatError::Provider(err.message));
        }

        let Some(candidate) = frame.candidates.into_iter().next() else {
            if let Some(reason) = frame.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ChatError::Provider(format!("prompt blocked: {reason}")));
            }
            return Ok(Decoded::Skip);
        };

        let parts: Vec<String> = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.text.unwrap_or_default())
            .collect();

        if parts.is_empty() {
            return Ok(Decoded::Skip);
        }
        Ok(Decoded::Delta(ChatDelta::Parts(parts)))
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(config: &'a AgentConfig, prompt: &'a str) -> Self {
        let generation_config = (config.temperature.is_some() || config.max_tokens.is_some())
            .then_some(GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            });

        Self {
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![RequestPart { text: prompt }],
            }],
            system_instruction: config.system_prompt.as_deref().map(|text| RequestContent {
                role: None,
                parts: vec![RequestPart { text }],
            }),
            generation_config,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
