//! Error types for persona-chat
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for persona-chat operations
///
/// Covers configuration loading, persona lookup, the chat transport, and
/// the session state guard. Transport-level variants are what a chat turn
/// converts into a visible assistant message; they never escape `submit`.
#[derive(Error, Debug)]
pub enum PersonaChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persona catalog errors (missing file, unknown handle)
    #[error("Persona error: {0}")]
    Persona(String),

    /// Network failure before a response arrived
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Message taken from the `error` field of the body, or the status line
        message: String,
    },

    /// The endpoint answered successfully but sent no body to stream
    #[error("Response has no body")]
    MissingBody,

    /// Reading the response body failed mid-stream
    #[error("Stream error: {0}")]
    Stream(String),

    /// A submission is already streaming on this session
    #[error("Chat session is busy with another request")]
    SessionBusy,

    /// IO errors reading the config file or persona catalog
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors in the config file or persona catalog
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for persona-chat operations
///
/// Uses `anyhow::Error` so callers get rich context and `?` propagation;
/// typed variants are recovered with `downcast_ref::<PersonaChatError>()`.
pub type Result<T> = anyhow::Result<T>;
