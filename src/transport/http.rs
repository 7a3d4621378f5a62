//! HTTPS transport for streamed chat completions
//!
//! [`HttpTransport`] POSTs the [`ChatRequest`] as JSON with a bearer
//! credential and returns the response body as a raw byte stream. Status
//! handling:
//!
//! - `2xx` with a body -- the body is streamed to the caller.
//! - `204 No Content` -- [`PersonaChatError::MissingBody`].
//! - any other status -- [`PersonaChatError::Api`], with the message taken
//!   from a JSON `{"error": "..."}` body when present.

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;

use crate::config::EndpointConfig;
use crate::error::{PersonaChatError, Result};
use crate::transport::{ByteStream, ChatRequest, ChatTransport};

/// Error body some endpoints return alongside a failure status
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Chat transport speaking HTTPS to the configured endpoint
///
/// # Examples
///
/// ```
/// use persona_chat::config::EndpointConfig;
/// use persona_chat::transport::HttpTransport;
///
/// let config = EndpointConfig {
///     url: "http://localhost:8787/chat".to_string(),
///     ..Default::default()
/// };
/// let transport = HttpTransport::new(&config);
/// assert!(transport.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: url::Url,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Creates a transport for `config`
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the HTTP client cannot be built
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let url = url::Url::parse(&config.url).map_err(|e| {
            PersonaChatError::Config(format!("Invalid endpoint URL '{}': {}", config.url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("persona-chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PersonaChatError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized chat transport: endpoint={}", url);

        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        tracing::debug!(
            "Sending chat request: {} messages, persona={}",
            request.messages.len(),
            request.persona.display_handle()
        );

        let mut builder = self
            .client
            .post(self.url.as_str())
            .header("Accept", "text/event-stream")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Chat request failed: {}", e);
            PersonaChatError::Transport(format!("Chat request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Chat endpoint returned error {}: {}", status, body);
            return Err(api_error(status, &body).into());
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Err(PersonaChatError::MissingBody.into());
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                anyhow::Error::from(PersonaChatError::Stream(format!(
                    "Failed to read body: {}",
                    e
                )))
            })
        });
        Ok(Box::pin(stream))
    }
}

/// Builds the error for a non-success response
///
/// Prefers the `error` field of a JSON body; falls back to the status line.
fn api_error(status: reqwest::StatusCode, body: &str) -> PersonaChatError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status));

    PersonaChatError::Api {
        status: status.as_u16(),
        message,
    }
}
