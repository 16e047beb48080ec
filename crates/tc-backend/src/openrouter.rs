//! OpenRouter, an OpenAI-compatible gateway to many hosted models.

use reqwest::Client;
use tracing::debug;

use crate::agent::{snapshot_stream, SnapshotStream, StreamingChatAgent};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::http::{build_http_client, open_sse};
use crate::openai::{ChatCompletionsDecoder, ChatCompletionsRequest, DEFAULT_SYSTEM_PROMPT};

pub const API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-nemo";

/// Attribution headers OpenRouter uses to identify the calling app.
const REFERER: &str = "https://github.com/thinkchat/thinkchat";
const TITLE: &str = "thinkchat";

pub fn default_config() -> AgentConfig {
    AgentConfig::new(DEFAULT_MODEL, API_BASE).with_system_prompt(DEFAULT_SYSTEM_PROMPT)
}

/// OpenRouter chat agent.
pub struct OpenRouterAgent {
    api_key: String,
    config: AgentConfig,
    http: Client,
}

impl OpenRouterAgent {
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

impl StreamingChatAgent for OpenRouterAgent {
    fn stream_chat(&self, prompt: &str) -> SnapshotStream {
        debug!(model = %self.config.model, "openrouter request");
        let request = self
            .http
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&ChatCompletionsRequest::new(&self.config, prompt));

        snapshot_stream("openrouter", open_sse(request), ChatCompletionsDecoder)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
