//! persona-chat - streamed chat with AI-agent personas
//!
//! This library provides the chat core used by the `persona-chat` CLI:
//! a session that sends the conversation and persona context to a
//! chat-completion endpoint and assembles the streamed reply as it arrives.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `chat`: Transcript types, the streamed body decoder, and `ChatSession`
//! - `transport`: `ChatTransport` abstraction and the HTTPS implementation
//! - `persona`: Persona context, voice settings, and the persona catalog
//! - `cache`: Load-once memoization used by the catalog
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use persona_chat::{ChatSession, Config};
//! use persona_chat::persona::Persona;
//! use persona_chat::transport::HttpTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let transport = Arc::new(HttpTransport::new(&config.endpoint)?);
//!     let session = ChatSession::new(transport, Persona::new("Nova", "nova"), &config.stream);
//!     session.submit("Hello!").await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod persona;
pub mod transport;

// Re-export commonly used types
pub use chat::{ChatSession, Message, Role, SessionEvent};
pub use config::Config;
pub use error::{PersonaChatError, Result};
pub use persona::{Persona, PersonaCatalog};

#[cfg(test)]
pub mod test_utils;
