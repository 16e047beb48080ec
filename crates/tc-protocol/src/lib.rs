//! tc-protocol: Shared types for thinkchat.
//!
//! This crate defines the snapshot and delta types exchanged between the
//! provider backends and any frontend that renders a conversation.

pub mod history;
pub mod message;

pub use history::{ChatHistory, ChatTurn, Role};
pub use message::{ChatDelta, ChatSnapshot, StreamPhase};
