//! Chat transport abstraction and implementations
//!
//! This module defines the [`ChatTransport`] trait the chat session uses to
//! send a request and obtain the streamed response body. Concrete
//! implementations live in submodules:
//!
//! - [`http::HttpTransport`] -- HTTPS POST via `reqwest`, body streamed as
//!   raw byte chunks.
//! - `fake::FakeTransport` -- in-process scripted transport used in tests
//!   (cfg(test) only).
//!
//! # Design
//!
//! A transport only moves bytes: it serializes the [`ChatRequest`], checks
//! the response status, and hands back the body as a [`ByteStream`]. Framing
//! and delta extraction belong to [`crate::chat::decoder`].

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use serde::Serialize;

use crate::chat::{Message, Role};
use crate::error::Result;
use crate::persona::Persona;

pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpTransport;

/// Streamed response body, chunk by chunk in arrival order
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A transcript message reduced to what the endpoint needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    /// Sender role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Outbound chat-completion payload
///
/// Serializes as `{"messages": [...], "name": ..., "handle": ..., ...}` with
/// the persona fields flattened into the top-level object.
///
/// # Examples
///
/// ```
/// use persona_chat::chat::Message;
/// use persona_chat::persona::Persona;
/// use persona_chat::transport::ChatRequest;
///
/// let persona = Persona::new("Nova", "nova");
/// let request = ChatRequest::new(&[Message::user("hi")], &persona);
/// let json = serde_json::to_value(&request).unwrap();
///
/// assert_eq!(json["messages"][0]["role"], "user");
/// assert_eq!(json["handle"], "nova");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Full conversation so far, oldest first
    pub messages: Vec<WireMessage>,
    /// Persona context
    #[serde(flatten)]
    pub persona: Persona,
}

impl ChatRequest {
    /// Builds a request from a transcript and persona
    pub fn new(messages: &[Message], persona: &Persona) -> Self {
        Self {
            messages: messages.iter().map(WireMessage::from).collect(),
            persona: persona.clone(),
        }
    }
}

/// Something that can deliver a chat request and stream back the reply
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync + std::fmt::Debug {
    /// Sends `request` and returns the response body as a byte stream
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PersonaChatError::Transport`] when the request
    /// cannot be delivered, [`crate::error::PersonaChatError::Api`] for a
    /// non-success status, and [`crate::error::PersonaChatError::MissingBody`]
    /// when a successful response has no body.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream>;
}
