//! Conversation messages and role typing.
//!
//! Messages are the primary record of a session's conversation. Each message
//! carries a [`Role`], its text content, an optional image URL, a creation
//! timestamp, and the [`Stage`] that was active when it was appended; the
//! latter is what lets later stages render or summarize the history
//! stage-by-stage.
//!
//! # Examples
//!
//! ```rust
//! use ideaforge::message::{Message, Role};
//! use ideaforge::types::Stage;
//!
//! let user_msg = Message::user("I want to build a plant-care app", Stage::Brainstorm);
//! let reply = Message::assistant("What problem does it solve?", Stage::Brainstorm);
//!
//! assert!(user_msg.has_role(Role::User));
//! assert_eq!(reply.stage_at_creation, Stage::Brainstorm);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Stage;

/// The sender of a conversation message.
///
/// Serializes as a lowercase string to match what the UI layer exchanges
/// over the transport boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// The canonical lowercase string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a session's conversation history.
///
/// Construct messages with the convenience constructors rather than struct
/// literals so the creation timestamp is always populated:
///
/// ```rust
/// use ideaforge::message::Message;
/// use ideaforge::types::Stage;
///
/// let msg = Message::assistant("Here is a first summary.", Stage::Summary);
/// assert_eq!(msg.role.as_str(), "assistant");
/// assert_eq!(msg.stage_at_creation, Stage::Summary);
/// assert!(msg.image_url.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    pub role: Role,
    /// The text content.
    pub content: String,
    /// Optional image attachment, by URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// When the message was appended to the session.
    pub created_at: DateTime<Utc>,
    /// The session stage that was active when this message was appended.
    ///
    /// This is deliberately *not* the session's current stage: a summary
    /// tick appends its assistant message tagged with the stage being
    /// entered, and old brainstorm messages keep their original tag.
    pub stage_at_creation: Stage,
}

impl Message {
    /// Creates a new message with the given role, content, and stage tag.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>, stage: Stage) -> Self {
        Self {
            role,
            content: content.into(),
            image_url: None,
            created_at: Utc::now(),
            stage_at_creation: stage,
        }
    }

    /// Creates a user message tagged with the given stage.
    #[must_use]
    pub fn user(content: impl Into<String>, stage: Stage) -> Self {
        Self::new(Role::User, content, stage)
    }

    /// Creates an assistant message tagged with the given stage.
    #[must_use]
    pub fn assistant(content: impl Into<String>, stage: Stage) -> Self {
        Self::new(Role::Assistant, content, stage)
    }

    /// Attaches an image URL.
    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Returns `true` if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_constructors() {
        let user_msg = Message::user("Hello", Stage::Brainstorm);
        assert_eq!(user_msg.role, Role::User);
        assert_eq!(user_msg.content, "Hello");
        assert_eq!(user_msg.stage_at_creation, Stage::Brainstorm);

        let assistant_msg = Message::assistant("Hi there!", Stage::Summary);
        assert_eq!(assistant_msg.role, Role::Assistant);
        assert_eq!(assistant_msg.stage_at_creation, Stage::Summary);
    }

    #[test]
    fn role_checking() {
        let msg = Message::user("Hello", Stage::Brainstorm);
        assert!(msg.has_role(Role::User));
        assert!(!msg.has_role(Role::Assistant));
    }

    #[test]
    fn image_url_builder() {
        let msg = Message::user("see sketch", Stage::Brainstorm)
            .with_image_url("https://example.com/sketch.png");
        assert_eq!(msg.image_url.as_deref(), Some("https://example.com/sketch.png"));
    }

    #[test]
    fn serialization_round_trip() {
        let original = Message::assistant("Test message", Stage::Prd);
        let json = serde_json::to_string(&original).expect("serialization failed");
        assert!(json.contains("\"assistant\""));
        assert!(json.contains("\"prd\""));
        let parsed: Message = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(original, parsed);
    }

    #[test]
    fn image_url_omitted_when_absent() {
        let msg = Message::user("plain", Stage::Brainstorm);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("image_url"));
    }
}
