//! Session command surface: one line of user input → one [`Command`].

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Capture,
    Query(String),
    /// Analyze the current image, optionally replacing the query first
    Analyze(Option<String>),
    Status,
    Config,
    Help,
    Quit,
    /// Blank line
    Nothing,
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Parse one input line. The error is a short usage message.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Nothing);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "upload" | "open" => {
            let path = strip_quotes(rest);
            if path.is_empty() {
                return Err("Usage: upload <path to .png/.jpg>".to_string());
            }
            Ok(Command::Upload(PathBuf::from(path)))
        }
        "capture" | "screenshot" => Ok(Command::Capture),
        "query" | "q" => Ok(Command::Query(rest.to_string())),
        "analyze" | "analyse" | "ask" => {
            if rest.is_empty() {
                Ok(Command::Analyze(None))
            } else {
                Ok(Command::Analyze(Some(rest.to_string())))
            }
        }
        "status" => Ok(Command::Status),
        "config" => Ok(Command::Config),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        _ => Err(crate::services::prompts::unknown_command(head)),
    }
}
