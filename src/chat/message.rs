//! Transcript types: roles, messages, and the ordered conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the person chatting
    User,
    /// Text generated by the persona
    Assistant,
}

impl Role {
    /// Wire name of the role
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

/// A single transcript entry
///
/// Content is only mutated for the assistant message that is currently
/// streaming, and only by appending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque unique identifier
    pub id: String,
    /// Who sent the message
    pub role: Role,
    /// Text content
    pub content: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use persona_chat::chat::{Message, Role};
    ///
    /// let msg = Message::user("hi there");
    /// assert_eq!(msg.role, Role::User);
    /// assert_eq!(msg.content, "hi there");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered, append-only conversation history
///
/// Tracks which assistant message (if any) is still receiving deltas so
/// that at most one message is in progress at a time.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    streaming_id: Option<String>,
}

impl Transcript {
    /// Creates an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished message and returns a copy of it
    ///
    /// Any in-progress assistant message is finalized first.
    pub fn push(&mut self, message: Message) -> Message {
        self.streaming_id = None;
        self.messages.push(message.clone());
        message
    }

    /// Sets the in-progress assistant content to `content`
    ///
    /// If the last message is the in-progress assistant message its content is
    /// replaced; otherwise a new assistant message is appended and becomes the
    /// in-progress one. Returns the message and whether it was newly created.
    pub fn upsert_streaming(&mut self, content: &str) -> (Message, bool) {
        if let Some(id) = &self.streaming_id {
            if let Some(last) = self.messages.last_mut() {
                if &last.id == id {
                    last.content.clear();
                    last.content.push_str(content);
                    return (last.clone(), false);
                }
            }
        }

        let message = Message::assistant(content);
        self.streaming_id = Some(message.id.clone());
        self.messages.push(message.clone());
        (message, true)
    }

    /// Marks the in-progress assistant message (if any) as complete
    pub fn finish_streaming(&mut self) {
        self.streaming_id = None;
    }

    /// Removes every message
    pub fn clear(&mut self) {
        self.messages.clear();
        self.streaming_id = None;
    }

    /// All messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
