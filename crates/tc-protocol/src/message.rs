//! Snapshot and delta types for streaming chat responses.

use serde::{Deserialize, Serialize};

/// Cumulative view of one streaming reply.
///
/// Both fields hold everything received so far, so a renderer overwrites
/// its display with each snapshot rather than appending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    /// Reasoning text. Always empty for providers without a thinking channel.
    pub thinking: String,
    /// Final answer text.
    pub response: String,
}

impl ChatSnapshot {
    pub fn new(thinking: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            thinking: thinking.into(),
            response: response.into(),
        }
    }

    /// Snapshot carrying only response text.
    pub fn response(response: impl Into<String>) -> Self {
        Self::new(String::new(), response)
    }

    /// Snapshot reporting a failure in place of model output.
    pub fn error(reason: impl std::fmt::Display) -> Self {
        Self {
            thinking: format!("Error in thinking process: {reason}"),
            response: format!("Error generating response: {reason}"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thinking.is_empty() && self.response.is_empty()
    }

    /// True when `next` only appends to the text held here.
    pub fn is_extended_by(&self, next: &ChatSnapshot) -> bool {
        next.thinking.starts_with(&self.thinking) && next.response.starts_with(&self.response)
    }
}

/// New text decoded from one provider frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatDelta {
    /// A frame that decoded cleanly but carried no new text.
    Empty,
    /// Text for the single response channel.
    Response(String),
    /// Ordered content parts from a dual-channel provider. Whether a part
    /// lands in thinking or response depends on the stream's phase.
    Parts(Vec<String>),
}

/// Lifecycle of one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPhase {
    /// Dual-channel text still goes to `thinking`.
    #[default]
    Thinking,
    /// All further text goes to `response`. Never reverts to `Thinking`.
    Response,
    /// The stream ended normally.
    Done,
    /// The stream ended with an error snapshot.
    Failed,
}

impl StreamPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamPhase::Done | StreamPhase::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_snapshot_fills_both_fields() {
        let snap = ChatSnapshot::error("connection refused");
        assert_eq!(snap.thinking, "Error in thinking process: connection refused");
        assert_eq!(snap.response, "Error generating response: connection refused");
    }

    #[test]
    fn extension_requires_prefix_on_both_channels() {
        let a = ChatSnapshot::new("Let me", "");
        let b = ChatSnapshot::new("Let me think", "4");
        assert!(a.is_extended_by(&b));
        assert!(!b.is_extended_by(&a));
        assert!(!a.is_extended_by(&ChatSnapshot::error("boom")));
    }

    #[test]
    fn terminal_phases() {
        assert!(!StreamPhase::Thinking.is_terminal());
        assert!(!StreamPhase::Response.is_terminal());
        assert!(StreamPhase::Done.is_terminal());
        assert!(StreamPhase::Failed.is_terminal());
    }

    #[test]
    fn snapshot_serializes_with_both_keys() {
        let json = serde_json::to_value(ChatSnapshot::response("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"thinking": "", "response": "hi"}));
    }
}
