//! Inline chat command parser for non-REPL channels.
//!
//! Provides portable slash command parsing that works across all channels
//! (web gateway, Telegram, Slack, HTTP webhook, etc.). Converts recognized
//! commands into [`ParsedCommand`] variants that the agent loop can process.
//!
//! # Usage
//!
//! ```rust
//! use ironclaw::channels::inline_commands::{parse_inline_command, InlineCommandConfig};
//!
//! let config = InlineCommandConfig::default();
//! let result = parse_inline_command("/help", &config);
//! // result is ParsedCommand::Command { name: "help", args: [], raw: "/help" }
//! ```
//!
//! Channels that want inline command support call [`parse_inline_command`] on
//! each incoming message before forwarding it to the agent loop.

use serde::{Deserialize, Serialize};

/// Result of parsing a potential inline command from any channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    /// A recognized slash command.
    Command {
        /// Canonical (lowercased) command name without the prefix.
        name: String,
        /// Positional arguments following the command.
        args: Vec<String>,
        /// The original raw input string.
        raw: String,
    },
    /// An approval response (yes/no/always).
    Approval {
        /// Whether execution was approved.
        approved: bool,
        /// Whether approval applies for the rest of the session.
        always: bool,
    },
    /// Regular user input (not a command).
    UserInput(String),
}

/// Configuration for inline command parsing.
#[derive(Debug, Clone)]
pub struct InlineCommandConfig {
    /// Whether to enable slash command parsing.
    pub enabled: bool,
    /// Prefix for commands (default: "/").
    pub prefix: String,
    /// Commands that are allowed in this channel.
    /// Empty means all recognized commands are allowed.
    pub allowed_commands: Vec<String>,
    /// Commands that are blocked in this channel.
    pub blocked_commands: Vec<String>,
}

impl Default for InlineCommandConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "/".to_string(),
            allowed_commands: Vec::new(),
            blocked_commands: vec![
                "quit".to_string(),
                "exit".to_string(),
                "shutdown".to_string(),
            ],
        }
    }
}

/// Category of a command for grouping in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandCategory {
    /// Session lifecycle: /new, /clear, /thread.
    Session,
    /// Navigation: /undo, /redo, /resume.
    Navigation,
    /// Information: /help, /version, /tools, /status, /ping.
    Information,
    /// Model selection: /model.
    Model,
    /// Context management: /compact, /summarize.
    Context,
    /// Actions: /suggest, /heartbeat, /interrupt, /cancel.
    Action,
}

/// Descriptor for a recognized command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Command name (without prefix).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Argument syntax hint (e.g. "[model_name]", "<thread_id>").
    pub args: String,
    /// Grouping category.
    pub category: CommandCategory,
}

/// All recognized commands with their metadata.
pub fn available_commands() -> Vec<CommandInfo> {
    vec![
        // Session
        CommandInfo {
            name: "new".to_string(),
            description: "Start a new conversation thread".to_string(),
            args: String::new(),
            category: CommandCategory::Session,
        },
        CommandInfo {
            name: "clear".to_string(),
            description: "Clear the current conversation".to_string(),
            args: String::new(),
            category: CommandCategory::Session,
        },
        CommandInfo {
            name: "thread".to_string(),
            description: "Switch to a thread by ID, or 'new' for a new thread".to_string(),
            args: "<thread_id|new>".to_string(),
            category: CommandCategory::Session,
        },
        // Navigation
        CommandInfo {
            name: "undo".to_string(),
            description: "Undo the last turn".to_string(),
            args: String::new(),
            category: CommandCategory::Navigation,
        },
        CommandInfo {
            name: "redo".to_string(),
            description: "Redo an undone turn".to_string(),
            args: String::new(),
            category: CommandCategory::Navigation,
        },
        CommandInfo {
            name: "resume".to_string(),
            description: "Resume from a checkpoint".to_string(),
            args: "<checkpoint_id>".to_string(),
            category: CommandCategory::Navigation,
        },
        // Information
        CommandInfo {
            name: "help".to_string(),
            description: "Show available commands".to_string(),
            args: String::new(),
            category: CommandCategory::Information,
        },
        CommandInfo {
            name: "version".to_string(),
            description: "Show the current version".to_string(),
            args: String::new(),
            category: CommandCategory::Information,
        },
        CommandInfo {
            name: "tools".to_string(),
            description: "List available tools".to_string(),
            args: String::new(),
            category: CommandCategory::Information,
        },
        CommandInfo {
            name: "status".to_string(),
            description: "Show agent status".to_string(),
            args: String::new(),
            category: CommandCategory::Information,
        },
        CommandInfo {
            name: "ping".to_string(),
            description: "Check if the agent is alive".to_string(),
            args: String::new(),
            category: CommandCategory::Information,
        },
        // Model
        CommandInfo {
            name: "model".to_string(),
            description: "Show or switch the current model".to_string(),
            args: "[model_name]".to_string(),
            category: CommandCategory::Model,
        },
        // Context
        CommandInfo {
            name: "compact".to_string(),
            description: "Compact the context window".to_string(),
            args: String::new(),
            category: CommandCategory::Context,
        },
        CommandInfo {
            name: "summarize".to_string(),
            description: "Summarize the current thread".to_string(),
            args: String::new(),
            category: CommandCategory::Context,
        },
        // Action
        CommandInfo {
            name: "suggest".to_string(),
            description: "Suggest next steps".to_string(),
            args: String::new(),
            category: CommandCategory::Action,
        },
        CommandInfo {
            name: "heartbeat".to_string(),
            description: "Trigger a manual heartbeat check".to_string(),
            args: String::new(),
            category: CommandCategory::Action,
        },
        CommandInfo {
            name: "interrupt".to_string(),
            description: "Stop the current operation".to_string(),
            args: String::new(),
            category: CommandCategory::Action,
        },
        CommandInfo {
            name: "cancel".to_string(),
            description: "Cancel a running job".to_string(),
            args: "[job_id]".to_string(),
            category: CommandCategory::Action,
        },
    ]
}

/// Canonical set of recognized command names for fast lookup.
fn recognized_commands() -> &'static [&'static str] {
    &[
        "new",
        "clear",
        "thread",
        "undo",
        "redo",
        "resume",
        "help",
        "version",
        "tools",
        "status",
        "ping",
        "model",
        "compact",
        "summarize",
        "summary",
        "suggest",
        "heartbeat",
        "interrupt",
        "stop",
        "cancel",
        "debug",
        "job",
        "list",
    ]
}

/// Parse a message from any channel into a command or user input.
///
/// The function checks for:
/// 1. Approval responses (yes/no/always and variants).
/// 2. Slash commands starting with the configured prefix.
/// 3. Everything else is returned as [`ParsedCommand::UserInput`].
///
/// Commands are matched case-insensitively. The `name` field of a returned
/// [`ParsedCommand::Command`] is always lowercased.
pub fn parse_inline_command(input: &str, config: &InlineCommandConfig) -> ParsedCommand {
    let trimmed = input.trim();

    // Empty or whitespace-only input is regular user input.
    if trimmed.is_empty() {
        return ParsedCommand::UserInput(input.to_string());
    }

    // Check for approval responses first (these don't need the prefix).
    match trimmed.to_lowercase().as_str() {
        "yes" | "y" | "approve" | "ok" => {
            return ParsedCommand::Approval {
                approved: true,
                always: false,
            };
        }
        "always" | "a" | "yes always" | "approve always" => {
            return ParsedCommand::Approval {
                approved: true,
                always: true,
            };
        }
        "no" | "n" | "deny" | "reject" => {
            return ParsedCommand::Approval {
                approved: false,
                always: false,
            };
        }
        _ => {}
    }

    // If command parsing is disabled, everything else is user input.
    if !config.enabled {
        return ParsedCommand::UserInput(input.to_string());
    }

    // Check for the command prefix.
    if !trimmed.starts_with(&config.prefix) {
        return ParsedCommand::UserInput(input.to_string());
    }

    // Strip the prefix and split into command + args.
    let without_prefix = &trimmed[config.prefix.len()..];
    if without_prefix.is_empty() {
        return ParsedCommand::UserInput(input.to_string());
    }

    let parts: Vec<&str> = without_prefix.split_whitespace().collect();
    if parts.is_empty() {
        return ParsedCommand::UserInput(input.to_string());
    }

    let cmd_name = parts[0].to_lowercase();
    let args: Vec<String> = parts[1..].iter().map(|s| s.to_string()).collect();

    // Check if this is a recognized command.
    if !recognized_commands().contains(&cmd_name.as_str()) {
        return ParsedCommand::UserInput(input.to_string());
    }

    // Check the blocked list.
    if config
        .blocked_commands
        .iter()
        .any(|b| b.to_lowercase() == cmd_name)
    {
        return ParsedCommand::UserInput(input.to_string());
    }

    // Check the allowed list (empty = all allowed).
    if !config.allowed_commands.is_empty()
        && !config
            .allowed_commands
            .iter()
            .any(|a| a.to_lowercase() == cmd_name)
    {
        return ParsedCommand::UserInput(input.to_string());
    }

    ParsedCommand::Command {
        name: cmd_name,
        args,
        raw: input.to_string(),
    }
}

/// Format a help message listing available commands.
///
/// The output is plain-text (no ANSI escapes) so it renders well in any
/// channel. Commands that are blocked or not in the allowed list for the
/// given config are omitted.
pub fn format_help(config: &InlineCommandConfig) -> String {
    let commands = available_commands();
    let prefix = &config.prefix;

    let visible: Vec<&CommandInfo> = commands
        .iter()
        .filter(|cmd| {
            // Exclude blocked commands.
            if config
                .blocked_commands
                .iter()
                .any(|b| b.to_lowercase() == cmd.name)
            {
                return false;
            }
            // If an allowed list is specified, only include those.
            if !config.allowed_commands.is_empty()
                && !config
                    .allowed_commands
                    .iter()
                    .any(|a| a.to_lowercase() == cmd.name)
            {
                return false;
            }
            true
        })
        .collect();

    // Group by category.
    let categories = [
        (CommandCategory::Session, "Session"),
        (CommandCategory::Navigation, "Navigation"),
        (CommandCategory::Information, "Information"),
        (CommandCategory::Model, "Model"),
        (CommandCategory::Context, "Context"),
        (CommandCategory::Action, "Action"),
    ];

    let mut lines: Vec<String> = Vec::new();
    lines.push("Available commands:".to_string());
    lines.push(String::new());

    for (cat, label) in &categories {
        let in_cat: Vec<&&CommandInfo> = visible.iter().filter(|c| c.category == *cat).collect();
        if in_cat.is_empty() {
            continue;
        }

        lines.push(format!("  {label}"));

        for cmd in in_cat {
            let name_and_args = if cmd.args.is_empty() {
                format!("{prefix}{}", cmd.name)
            } else {
                format!("{prefix}{} {}", cmd.name, cmd.args)
            };
            lines.push(format!("    {name_and_args:<30} {}", cmd.description));
        }

        lines.push(String::new());
    }

    lines.push("  Approval responses".to_string());
    lines.push("    yes (y)                        Approve tool execution".to_string());
    lines.push("    no (n)                         Deny tool execution".to_string());
    lines.push("    always (a)                     Approve for this session".to_string());

    lines.join("\n")
}
