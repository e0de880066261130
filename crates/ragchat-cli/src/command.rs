use ragchat_types::ThreadId;

use crate::error::CommandError;

pub const HELP: &str = "\
Type a message and press Enter to send it. End a line with \\ to continue on the next one.

  /new                 Start a new chat
  /list                Show conversations
  /open <n|thread-id>  Open a conversation
  /rename <n> [title]  Rename a conversation
  /delete <n>          Delete a conversation
  /cancel              Abort a rename
  /status              Show backend status
  /sidebar             Toggle the compact sidebar
  /help                Show this help
  /quit                Exit";

/// Conversation addressed by list row (1-based) or by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Row(usize),
    Thread(ThreadId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    List,
    Open(Target),
    Rename { row: usize, title: Option<String> },
    Delete(usize),
    Cancel,
    Status,
    Sidebar,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Command(Command),
}

/// Parse one complete prompt entry
///
/// Anything not starting with `/` is a message; `//` escapes a leading slash.
pub fn parse_input(text: &str) -> Result<Input, CommandError> {
    let trimmed = text.trim_start();
    if let Some(escaped) = trimmed.strip_prefix("//") {
        return Ok(Input::Message(format!("/{}", escaped)));
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Input::Message(text.to_string()));
    };

    let rest = rest.trim();
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "new" => Command::New,
        "list" | "ls" => Command::List,
        "open" => Command::Open(parse_target(args)?),
        "rename" => {
            let (row, title) = match args.split_once(char::is_whitespace) {
                Some((row, title)) => (row, Some(title.trim().to_string())),
                None => (args, None),
            };
            Command::Rename {
                row: parse_row(row, "/rename <n> [title]")?,
                title,
            }
        }
        "delete" | "rm" => Command::Delete(parse_row(args, "/delete <n>")?),
        "cancel" => Command::Cancel,
        "status" => Command::Status,
        "sidebar" => Command::Sidebar,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Input::Command(command))
}

fn parse_target(arg: &str) -> Result<Target, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::Usage("/open <n|thread-id>"));
    }
    match arg.parse::<usize>() {
        Ok(0) => Err(CommandError::NoSuchRow(0)),
        Ok(row) => Ok(Target::Row(row)),
        Err(_) => Ok(Target::Thread(ThreadId::from(arg))),
    }
}

fn parse_row(arg: &str, usage: &'static str) -> Result<usize, CommandError> {
    match arg.parse::<usize>() {
        Ok(0) => Err(CommandError::NoSuchRow(0)),
        Ok(row) => Ok(row),
        Err(_) => Err(CommandError::Usage(usage)),
    }
}

/// Joins lines ending in `\` into one entry
#[derive(Debug, Default)]
pub struct LineJoiner {
    buffer: Option<String>,
}

impl LineJoiner {
    /// Feed one line; returns the complete entry once a line does not continue
    pub fn push(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let (text, continues) = match line.strip_suffix('\\') {
            Some(text) => (text, true),
            None => (line, false),
        };

        let entry = match self.buffer.take() {
            Some(mut buffer) => {
                buffer.push('\n');
                buffer.push_str(text);
                buffer
            }
            None => text.to_string(),
        };

        if continues {
            self.buffer = Some(entry);
            None
        } else {
            Some(entry)
        }
    }

    pub fn is_continuing(&self) -> bool {
        self.buffer.is_some()
    }
}
