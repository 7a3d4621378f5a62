//! Command-line interface definition for persona-chat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot prompts, and
//! listing the persona catalog.

use clap::{Parser, Subcommand};

/// persona-chat - Chat with AI-agent personas
///
/// Replies are streamed from the configured chat-completion endpoint
/// and printed as they arrive.
#[derive(Parser, Debug, Clone)]
#[command(name = "persona-chat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the chat-completion endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for persona-chat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat with a persona
    Chat {
        /// Persona handle (defaults to the configured or first persona)
        #[arg(short, long)]
        persona: Option<String>,
    },

    /// Send a single prompt and stream the reply to stdout
    Ask {
        /// Persona handle (defaults to the configured or first persona)
        #[arg(short, long)]
        persona: Option<String>,

        /// Prompt text
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// List personas in the catalog
    Personas,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
