use std::path::PathBuf;

use addrclean_core::Msg;

use crate::terminal::app::AppEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Choose (or clear) the file for the next upload.
    Select(Option<PathBuf>),
    /// Upload, optionally selecting a file first.
    Upload(Option<PathBuf>),
    Start,
    Stop,
    Status,
    Download,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`; an unknown
/// command word comes back as the error.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let path = path_argument(rest);

    let command = match word.to_ascii_lowercase().as_str() {
        "select" | "file" => Command::Select(path),
        "upload" | "u" => Command::Upload(path),
        "start" => Command::Start,
        "stop" => Command::Stop,
        "status" | "refresh" => Command::Status,
        "download" | "dl" => Command::Download,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(word.to_string()),
    };
    Ok(Some(command))
}

/// Maps an input line to the events it triggers.
pub(crate) fn parse_line(line: &str) -> Vec<AppEvent> {
    match parse_command(line) {
        Ok(None) => Vec::new(),
        Ok(Some(Command::Help)) => vec![AppEvent::Help],
        Ok(Some(Command::Quit)) => vec![AppEvent::Quit],
        Ok(Some(command)) => command_msgs(command)
            .into_iter()
            .map(AppEvent::Controller)
            .collect(),
        Err(word) => vec![AppEvent::Unknown(word)],
    }
}

fn command_msgs(command: Command) -> Vec<Msg> {
    match command {
        Command::Select(path) => vec![Msg::FileSelected(path)],
        Command::Upload(Some(path)) => vec![Msg::FileSelected(Some(path)), Msg::UploadClicked],
        Command::Upload(None) => vec![Msg::UploadClicked],
        Command::Start => vec![Msg::StartClicked],
        Command::Stop => vec![Msg::StopClicked],
        Command::Status => vec![Msg::RefreshRequested],
        Command::Download => vec![Msg::DownloadClicked],
        Command::Help | Command::Quit => Vec::new(),
    }
}

fn path_argument(rest: &str) -> Option<PathBuf> {
    let unquoted = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(rest)
        .trim();
    if unquoted.is_empty() {
        None
    } else {
        Some(PathBuf::from(unquoted))
    }
}
