//! tc-backend: LLM provider adapters for thinkchat.
//!
//! Every provider is exposed through one [`StreamingChatAgent`] contract:
//! pass a prompt, pull cumulative `{thinking, response}` snapshots. The
//! provider modules differ only in how they open the stream and decode
//! each frame.

pub mod agent;
pub mod anthropic;
pub mod config;
pub mod error;
pub mod gemini;
pub mod http;
pub mod mock;
pub mod openai;
pub mod openrouter;
pub mod registry;
pub mod sse;
pub mod together;

pub use agent::{snapshot_stream, ChunkDecoder, Decoded, SnapshotStream, StreamState, StreamingChatAgent};
pub use anthropic::AnthropicAgent;
pub use config::{AgentConfig, HttpConfig};
pub use error::{ChatError, ErrorKind};
pub use gemini::GeminiAgent;
pub use mock::{MockAgent, MockConfig, MockFrame};
pub use openai::OpenAiAgent;
pub use openrouter::OpenRouterAgent;
pub use registry::{AgentDescriptor, AgentFactory, AgentRegistry};
pub use together::TogetherAgent;
