//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and control the transcript and the in-flight
//! reply; anything else is sent as a question.

use std::io::Write;

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Load the next page of older messages and open the pager at the top.
    Older,
    /// Open the transcript pager where the reader left it.
    Scroll,
    /// Reprint the newest messages and follow new ones again.
    Latest,
    /// Stop the reply that is streaming.
    Stop,
    /// List sessions, marking the current one.
    Sessions,
    /// Clear the terminal screen.
    Clear,
    /// Leave the chat.
    Exit,
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/older" | "/more" => Some(ChatCommand::Older),
        "/scroll" | "/view" => Some(ChatCommand::Scroll),
        "/latest" | "/bottom" => Some(ChatCommand::Latest),
        "/stop" => Some(ChatCommand::Stop),
        "/sessions" | "/ls" => Some(ChatCommand::Sessions),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Write the help text listing all available commands.
pub fn write_help(out: &mut impl Write) -> std::io::Result<()> {
    let rows = [
        ("/help", "Show this help message"),
        ("/older", "Load older messages and browse them"),
        ("/scroll", "Browse the transcript (works while a reply streams)"),
        ("/latest", "Jump back to the newest messages"),
        ("/stop", "Stop the reply that is streaming"),
        ("/sessions", "List your sessions"),
        ("/clear", "Clear the screen"),
        ("/exit", "Leave the chat"),
    ];

    writeln!(out)?;
    writeln!(out, "  {}", style("Available commands:").bold())?;
    writeln!(out)?;
    for (name, help) in rows {
        writeln!(out, "  {:<10} {help}", style(name).cyan())?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style("Ctrl+C stops a streaming reply, Ctrl+D exits").dim()
    )?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_help() {
        assert_eq!(parse("/help"), Some(ChatCommand::Help));
        assert_eq!(parse("/h"), Some(ChatCommand::Help));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn test_parse_exit() {
        assert_eq!(parse("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/quit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/Q"), Some(ChatCommand::Exit));
    }

    #[test]
    fn test_parse_transcript_commands() {
        assert_eq!(parse("/older"), Some(ChatCommand::Older));
        assert_eq!(parse("/view"), Some(ChatCommand::Scroll));
        assert_eq!(parse("  /latest  "), Some(ChatCommand::Latest));
        assert_eq!(parse("/stop now"), Some(ChatCommand::Stop));
        assert_eq!(parse("/sessions"), Some(ChatCommand::Sessions));
    }

    #[test]
    fn test_parse_not_command() {
        assert_eq!(parse("what does section 4 say?"), None);
        assert_eq!(parse("and/or"), None);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse("/foo bar"), Some(ChatCommand::Unknown("/foo".to_string())));
    }

    #[test]
    fn test_help_lists_every_command() {
        let mut out = Vec::new();
        write_help(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        for name in ["/help", "/older", "/scroll", "/latest", "/stop", "/sessions", "/clear", "/exit"] {
            assert!(text.contains(name), "help is missing {name}");
        }
    }
}
