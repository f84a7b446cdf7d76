//! Text-generation collaborator abstraction.
//!
//! The generator is stateless between calls: every request carries the full
//! transcript it needs.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AdventureError;

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Fixed instructions for the generator.
    System,
    /// The listener's choices.
    User,
    /// What the generator said (or is replayed as having said).
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One role-tagged transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Builds a message with the given role.
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Builds a `system` message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Builds a `user` message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Builds an `assistant` message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Stateless chat-completion backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Continues `transcript` and returns the raw reply text.
    ///
    /// Implementations report transport failures as
    /// `AdventureError::Generation`; they do not parse the reply.
    async fn generate(&self, transcript: &[ChatMessage]) -> Result<String, AdventureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_serializes_lowercase_role() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();

        assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "hi" }));
    }
}
