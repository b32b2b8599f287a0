//! Command router: classify inbound text into an [`Intent`].
//!
//! Matching is case-insensitive on trimmed text. Literal command words are
//! checked before the `/<name>_status` suffix rule, so `/tool_status` and
//! `/status` never fall through to it.

use crate::inventory::normalize_id;

const STATUS_SUFFIX: &str = "_status";

/// A command that takes a tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/tool_status <name>`
    ToolStatus,
    /// `/<name>_status`
    NameStatus,
    /// `/status <name>`
    Status,
    /// `/rent_tool <name>`
    RentTool,
    /// `/return_tool <name>`
    ReturnTool,
}

impl Command {
    /// Usage line shown when the tool name is missing.
    pub fn usage(&self) -> &'static str {
        match self {
            Self::ToolStatus => "/tool_status <name>",
            Self::NameStatus => "/<name>_status",
            Self::Status => "/status <name>",
            Self::RentTool => "/rent_tool <name>",
            Self::ReturnTool => "/return_tool <name>",
        }
    }
}

/// Classified meaning of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// List every tool.
    ListTools,
    /// Show the command list.
    Help,
    /// Show one tool's status and pricing.
    GetStatus(String),
    /// Rent a tool.
    RentTool(String),
    /// Return a rented tool.
    ReturnTool(String),
    /// A name-taking command arrived without a usable name.
    MissingArgument(Command),
    /// Anything else; carries the trimmed text.
    Unknown(String),
}

/// Classify raw inbound text.
pub fn classify(raw: &str) -> Intent {
    let text = raw.trim();
    let mut tokens = text.split_whitespace();
    let Some(head) = tokens.next() else {
        return Intent::Unknown(String::new());
    };
    let argument = tokens.collect::<Vec<_>>().join(" ");

    match head.to_lowercase().as_str() {
        "/tool_rental" => Intent::ListTools,
        "/help" | "/start" => Intent::Help,
        "/tool_status" => with_name(Command::ToolStatus, argument, Intent::GetStatus),
        "/rent_tool" => with_name(Command::RentTool, argument, Intent::RentTool),
        "/return_tool" => with_name(Command::ReturnTool, argument, Intent::ReturnTool),
        "/status" => with_name(Command::Status, argument, Intent::GetStatus),
        _ => match status_stem(text) {
            Some(stem) => with_name(Command::NameStatus, stem.trim().to_owned(), Intent::GetStatus),
            None => Intent::Unknown(text.to_owned()),
        },
    }
}

fn with_name(command: Command, name: String, intent: fn(String) -> Intent) -> Intent {
    if normalize_id(&name).is_empty() {
        Intent::MissingArgument(command)
    } else {
        intent(name)
    }
}

/// Extract `<name>` from `/<name>_status`, ignoring suffix case.
fn status_stem(text: &str) -> Option<&str> {
    let body = text.strip_prefix('/')?;
    let split = body.len().checked_sub(STATUS_SUFFIX.len())?;
    let suffix = body.get(split..)?;
    if !suffix.eq_ignore_ascii_case(STATUS_SUFFIX) {
        return None;
    }
    body.get(..split)
}

/// Command list shared by `/help` and the unknown-command reply.
pub fn help_text() -> String {
    [
        "*Tool rental commands:*",
        "/tool_rental: list all tools with status and prices",
        "/<name>_status: check one tool, e.g. /UnlockTool_status",
        "/tool_status <name>: same as above",
        "/status <name>: same as above",
        "/rent_tool <name>: rent an available tool",
        "/return_tool <name>: return a tool you rented",
    ]
    .join("\n")
}

/// Reply for an unrecognised message.
pub fn unknown_reply(text: &str) -> String {
    if text.is_empty() {
        return format!("🤖 I didn't catch that.\n\n{}", help_text());
    }
    format!("🤖 Unknown command: {text}\n\n{}", help_text())
}

/// Reply for a command missing its tool name.
pub fn missing_argument_reply(command: Command) -> String {
    format!(
        "⚠️ Please include a tool name. Usage: {}\nSend /tool_rental to see all tools.",
        command.usage()
    )
}
