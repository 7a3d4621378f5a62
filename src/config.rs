//! Configuration management for persona-chat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PersonaChatError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for persona-chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completion endpoint settings
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Streamed response handling
    #[serde(default)]
    pub stream: StreamConfig,
    /// Persona catalog settings
    #[serde(default)]
    pub personas: PersonasConfig,
}

/// Chat-completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// URL the chat request is POSTed to
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    /// Bearer credential sent in the `Authorization` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Overall HTTP timeout per request (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_endpoint_url() -> String {
    "http://localhost:54321/functions/v1/chat".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Streamed response configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// How many times one malformed record is retried before it is dropped
    #[serde(default = "default_max_rewinds")]
    pub max_rewinds: u32,

    /// Buffered progress events per subscriber before the oldest are lost
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_rewinds() -> u32 {
    crate::chat::decoder::DEFAULT_MAX_REWINDS
}

fn default_event_capacity() -> usize {
    256
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_rewinds: default_max_rewinds(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Persona catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonasConfig {
    /// Path to the YAML persona catalog
    #[serde(default = "default_catalog_path")]
    pub catalog: String,

    /// Handle used when none is given on the command line
    #[serde(default)]
    pub default_handle: Option<String>,
}

fn default_catalog_path() -> String {
    "config/personas.yaml".to_string()
}

impl Default for PersonasConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            default_handle: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(PersonaChatError::Io)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config = serde_yaml::from_str(&contents)
            .map_err(PersonaChatError::Yaml)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("PERSONA_CHAT_ENDPOINT") {
            self.endpoint.url = url;
        }

        if let Ok(key) = std::env::var("PERSONA_CHAT_API_KEY") {
            if !key.is_empty() {
                self.endpoint.api_key = Some(key);
            }
        }

        if let Ok(timeout) = std::env::var("PERSONA_CHAT_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.endpoint.timeout_seconds = secs,
                Err(_) => tracing::warn!("Ignoring invalid PERSONA_CHAT_TIMEOUT: {}", timeout),
            }
        }

        if let Ok(catalog) = std::env::var("PERSONA_CHAT_PERSONAS") {
            self.personas.catalog = catalog;
        }

        if let Ok(handle) = std::env::var("PERSONA_CHAT_PERSONA") {
            self.personas.default_handle = Some(handle);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(endpoint) = &cli.endpoint {
            tracing::debug!("Using endpoint override from CLI: {}", endpoint);
            self.endpoint.url = endpoint.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.url.trim().is_empty() {
            return Err(PersonaChatError::Config("endpoint.url cannot be empty".to_string()).into());
        }

        let url = url::Url::parse(&self.endpoint.url).map_err(|e| {
            PersonaChatError::Config(format!("endpoint.url is not a valid URL: {}", e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PersonaChatError::Config(format!(
                "endpoint.url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.endpoint.timeout_seconds == 0 {
            return Err(PersonaChatError::Config(
                "endpoint.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.stream.event_capacity == 0 {
            return Err(PersonaChatError::Config(
                "stream.event_capacity must be greater than 0".to_string(),
            )
            .into());
        }

        if self.personas.catalog.trim().is_empty() {
            return Err(
                PersonaChatError::Config("personas.catalog cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
