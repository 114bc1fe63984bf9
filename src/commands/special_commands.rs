//! Slash-command parser for the interactive chat session
//!
//! Lines starting with `/` control the session; anything else is a
//! follow-up question. Commands are case-insensitive.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing slash commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// A parsed line of chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Show available commands
    Help,
    /// Show the current report
    Report,
    /// Show the Q&A history
    History,
    /// Show session state
    Status,
    /// Start a new diagnosis with another image
    NewDiagnosis(PathBuf),
    /// Leave the session
    Exit,
    /// A follow-up question
    Question(String),
}

/// Parse one line of chat input
///
/// # Examples
///
/// ```
/// use medrax::commands::special_commands::{parse_chat_command, ChatCommand};
///
/// assert_eq!(parse_chat_command("/HISTORY"), Ok(ChatCommand::History));
/// assert_eq!(
///     parse_chat_command("Is there a fracture?"),
///     Ok(ChatCommand::Question("Is there a fracture?".to_string()))
/// );
/// ```
pub fn parse_chat_command(input: &str) -> Result<ChatCommand, CommandError> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return match trimmed.to_lowercase().as_str() {
            "exit" | "quit" => Ok(ChatCommand::Exit),
            _ => Ok(ChatCommand::Question(trimmed.to_string())),
        };
    }

    let (command, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((command, arg)) => (command.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    match command.as_str() {
        "/help" | "/?" => Ok(ChatCommand::Help),
        "/report" => Ok(ChatCommand::Report),
        "/history" => Ok(ChatCommand::History),
        "/status" => Ok(ChatCommand::Status),
        "/exit" | "/quit" => Ok(ChatCommand::Exit),
        "/new" if arg.is_empty() => Err(CommandError::MissingArgument {
            command: "/new".to_string(),
            usage: "/new <image_path>".to_string(),
        }),
        "/new" => Ok(ChatCommand::NewDiagnosis(PathBuf::from(arg))),
        _ => Err(CommandError::UnknownCommand(command)),
    }
}

/// Print the chat help text
pub fn print_help() {
    println!(
        r#"
Commands:
  /help            Show this help
  /report          Show the current report
  /history         Show questions and answers so far
  /status          Show session status
  /new <path>      Start a new diagnosis with another image
  /exit            Leave the session

Anything else is sent as a follow-up question about the report.
"#
    );
}
