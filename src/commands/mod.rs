/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`     — Interactive chat with a persona
- `ask`      — Send one prompt and stream the reply
- `personas` — List the persona catalog

The handlers share persona resolution, session construction, and the
streamed reply renderer defined here.
*/

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::broadcast;

use crate::chat::session::ERROR_MESSAGE_PREFIX;
use crate::chat::{ChatSession, Role, SessionEvent};
use crate::config::Config;
use crate::error::{PersonaChatError, Result};
use crate::persona::{CatalogSource, Persona, PersonaCatalog};
use crate::transport::HttpTransport;

// Special commands parser for the interactive loop
pub mod special_commands;

/// Resolve the persona to chat with
///
/// Order: explicit handle, then `personas.default_handle`, then the first
/// persona in the catalog.
///
/// # Errors
///
/// Returns error if the handle is unknown or the catalog is empty.
pub fn select_persona(
    catalog: &PersonaCatalog,
    handle: Option<&str>,
    config: &Config,
) -> Result<Persona> {
    let wanted = handle.or(config.personas.default_handle.as_deref());
    let persona = match wanted {
        Some(handle) => catalog.require(handle)?,
        None => catalog.first().ok_or_else(|| {
            PersonaChatError::Persona("Persona catalog is empty".to_string())
        })?,
    };
    Ok(persona.clone())
}

/// Load the shared catalog (first use only) and resolve the persona
pub async fn resolve_persona(
    catalog: &CatalogSource,
    handle: Option<&str>,
    config: &Config,
) -> Result<Persona> {
    let loaded = catalog.ensure_loaded().await?;
    select_persona(&loaded, handle, config)
}

/// Build a session talking to `persona` over HTTPS
pub fn build_session(config: &Config, persona: Persona) -> Result<ChatSession> {
    let transport = Arc::new(HttpTransport::new(&config.endpoint)?);
    Ok(ChatSession::new(transport, persona, &config.stream))
}

/// Print assistant output from `events` until the session goes idle
///
/// Deltas are written as they arrive. Failure messages are written in red,
/// on their own line when part of a reply was already printed.
pub async fn render_reply<W: Write>(
    events: &mut broadcast::Receiver<SessionEvent>,
    out: &mut W,
) -> Result<()> {
    let mut printed = false;
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended(message)) if message.role == Role::Assistant => {
                if message.content.starts_with(ERROR_MESSAGE_PREFIX) {
                    if printed {
                        writeln!(out)?;
                    }
                    write!(out, "{}", message.content.red())?;
                } else {
                    write!(out, "{}", message.content)?;
                }
                printed = true;
                out.flush()?;
            }
            Ok(SessionEvent::ContentUpdated { delta, .. }) => {
                write!(out, "{}", delta)?;
                printed = true;
                out.flush()?;
            }
            Ok(SessionEvent::BusyChanged(false)) => break,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Renderer fell behind, {} updates skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    writeln!(out)?;
    Ok(())
}

/// Submit `text` and render the reply to stdout while it streams
async fn submit_and_render(session: &ChatSession, text: &str) -> Result<()> {
    let mut events = session.subscribe();
    let mut stdout = std::io::stdout();
    let (submitted, rendered) =
        tokio::join!(session.submit(text), render_reply(&mut events, &mut stdout));
    submitted?;
    rendered
}

fn format_persona_line(persona: &Persona) -> String {
    let mut line = format!("{:<16} {}", persona.display_handle(), persona.name);
    if let Some(badge) = &persona.badge {
        line.push_str(&format!(" [{}]", badge));
    }
    line
}

fn print_persona_card(persona: &Persona) {
    println!("{}", format_persona_line(persona).bold());
    if let Some(bio) = &persona.bio {
        println!("  {}", bio);
    }
    if let Some(avatar) = &persona.avatar {
        println!("  {}", avatar.dimmed());
    }
    println!();
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Resolves the persona, creates a `ChatSession`, and runs a
    //! readline-based loop that streams each reply as it arrives.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `catalog` - Persona catalog shared by every handler
    /// * `persona` - Optional persona handle override
    pub async fn run_chat(
        config: Config,
        catalog: &CatalogSource,
        persona: Option<String>,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let persona = resolve_persona(catalog, persona.as_deref(), &config).await?;
        let session = build_session(&config, persona)?;

        let mut rl = DefaultEditor::new()?;
        let prompt = format!("{} ", ">>".cyan().bold());

        print_persona_card(session.persona());
        println!("Type '/help' for commands.\n");

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::Reset) => {
                            session.reset()?;
                            println!("{}\n", "Conversation cleared".green());
                            continue;
                        }
                        Ok(SpecialCommand::History) => {
                            print_history(&session);
                            continue;
                        }
                        Ok(SpecialCommand::ShowPersona) => {
                            print_persona_card(session.persona());
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().yellow());
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed)?;

                    print!("{} ", session.persona().display_handle().magenta().bold());
                    submit_and_render(&session, trimmed).await?;
                    println!();
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_history(session: &ChatSession) {
        let transcript = session.transcript();
        if transcript.is_empty() {
            println!("{}\n", "No messages yet".dimmed());
            return;
        }

        for message in transcript {
            let who = match message.role {
                Role::User => "you".cyan().bold(),
                Role::Assistant => session.persona().display_handle().magenta().bold(),
            };
            println!(
                "{} {} {}",
                message.created_at.format("%H:%M:%S").to_string().dimmed(),
                who,
                message.content
            );
        }
        println!();
    }
}

// One-shot prompt handler
pub mod ask {
    //! Single prompt handler: sends one message and streams the reply.

    use super::*;

    /// Send `prompt` to the persona and print the streamed reply
    pub async fn run_ask(
        config: Config,
        catalog: &CatalogSource,
        persona: Option<String>,
        prompt: String,
    ) -> Result<()> {
        let persona = resolve_persona(catalog, persona.as_deref(), &config).await?;
        tracing::info!("Asking {}", persona.display_handle());

        let session = build_session(&config, persona)?;
        submit_and_render(&session, &prompt).await
    }
}

// Persona listing handler
pub mod personas {
    //! Lists the persona catalog.

    use super::*;

    /// Print every persona in the catalog
    pub async fn list_personas(catalog: &CatalogSource) -> Result<()> {
        let loaded = catalog.ensure_loaded().await?;
        if loaded.is_empty() {
            println!("No personas in {}", catalog.path().display());
            return Ok(());
        }

        for persona in loaded.personas() {
            println!("{}", format_persona_line(persona));
        }
        Ok(())
    }
}
