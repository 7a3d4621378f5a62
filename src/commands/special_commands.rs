//! Special commands parser for interactive chat mode
//!
//! This module parses special commands that can be entered during an
//! interactive chat session. Special commands allow users to:
//! - Clear the transcript and start over
//! - Review the conversation so far
//! - Show the persona they are talking to
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/` and are case-insensitive.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands act on the session rather than being sent to the persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Clear the transcript
    Reset,

    /// Print every message in the transcript
    History,

    /// Show the persona card
    ShowPersona,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the persona as a regular message.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, and `CommandError::UnsupportedArgument` if a command that
/// takes no arguments is given one.
///
/// # Examples
///
/// ```
/// use persona_chat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/reset").unwrap(), SpecialCommand::Reset);
/// assert_eq!(parse_special_command("/NEW").unwrap(), SpecialCommand::Reset);
/// assert_eq!(parse_special_command("quit").unwrap(), SpecialCommand::Exit);
/// assert_eq!(parse_special_command("hello there").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut parts = lower.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let parsed = match command {
        "/reset" | "/new" | "/clear" => SpecialCommand::Reset,
        "/history" | "/transcript" => SpecialCommand::History,
        "/persona" | "/whois" => SpecialCommand::ShowPersona,
        "/help" | "/?" => SpecialCommand::Help,
        "/exit" | "/quit" | "exit" | "quit" => SpecialCommand::Exit,
        _ => return Err(CommandError::UnknownCommand(trimmed.to_string())),
    };

    if let Some(arg) = arg {
        return Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        });
    }

    Ok(parsed)
}

/// Print help for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

SESSION:
  /reset          - Clear the conversation and start over
  /new, /clear    - Same as /reset
  /history        - Show every message so far
  /persona        - Show who you are talking to

OTHER:
  /help           - Show this help message
  exit, quit      - Leave the chat (also /exit, Ctrl-D)

Anything else is sent to the persona.
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(
            parse_special_command("tell me about stars").unwrap(),
            SpecialCommand::None
        );
        assert_eq!(
            parse_special_command("  exited the building").unwrap(),
            SpecialCommand::None
        );
    }

    #[test]
    fn test_reset_aliases() {
        for input in ["/reset", "/new", "/CLEAR", "  /reset  "] {
            assert_eq!(parse_special_command(input).unwrap(), SpecialCommand::Reset);
        }
    }

    #[test]
    fn test_history_and_persona() {
        assert_eq!(
            parse_special_command("/history").unwrap(),
            SpecialCommand::History
        );
        assert_eq!(
            parse_special_command("/whois").unwrap(),
            SpecialCommand::ShowPersona
        );
    }

    #[test]
    fn test_exit_variants() {
        for input in ["exit", "QUIT", "/exit", "/quit"] {
            assert_eq!(parse_special_command(input).unwrap(), SpecialCommand::Exit);
        }
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_special_command("/mode write").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/mode write".to_string()));
    }

    #[test]
    fn test_argument_rejected() {
        let err = parse_special_command("/reset now").unwrap_err();
        assert_eq!(
            err,
            CommandError::UnsupportedArgument {
                command: "/reset".to_string(),
                arg: "now".to_string(),
            }
        );
    }
}
