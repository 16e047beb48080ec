//! Display-side conversation history.
//!
//! History is kept for rendering only. Agents receive the latest prompt and
//! nothing else.

use serde::{Deserialize, Serialize};

use crate::message::ChatSnapshot;

/// Role in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    /// Prompt text for user turns, response text for assistant turns.
    pub content: String,
    /// Reasoning shown alongside an assistant turn, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thinking: String,
    /// Model that produced an assistant turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            thinking: String::new(),
            model: None,
        }
    }

    pub fn assistant(snapshot: ChatSnapshot, model: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: snapshot.response,
            thinking: snapshot.thinking,
            model: Some(model.into()),
        }
    }
}

/// Ordered list of turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatHistory {
    pub turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
