use std::str::FromStr;

use crate::model::FeedbackTag;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new chat
    New,
    /// Switch to another chat by its sidebar number
    Switch,
    /// Delete a chat (asks for confirmation)
    Delete,
    /// Rate the selected reply as helpful
    Helpful,
    /// Rate the selected reply as not helpful
    NotHelpful,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// 1-based sidebar position given as the argument, converted to an index
    pub fn chat_index(&self) -> Option<usize> {
        let position: usize = self.argument()?.trim().parse().ok()?;
        position.checked_sub(1)
    }

    pub fn feedback_tag(&self) -> Option<FeedbackTag> {
        match self.command {
            SlashCommand::Helpful => Some(FeedbackTag::Helpful),
            SlashCommand::NotHelpful => Some(FeedbackTag::NotHelpful),
            _ => None,
        }
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new chat",
            SlashCommand::Switch => "switch to chat <n> from the sidebar",
            SlashCommand::Delete => "delete chat [n] (defaults to the current chat)",
            SlashCommand::Helpful => "mark the selected reply as helpful",
            SlashCommand::NotHelpful => "mark the selected reply as not helpful",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].split_whitespace();
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "exit" | "bye" => Some(SlashCommand::Quit),
        "n" => Some(SlashCommand::New),
        "s" | "open" => Some(SlashCommand::Switch),
        "d" | "rm" => Some(SlashCommand::Delete),
        "h" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nCtrl+Up / Ctrl+Down select a reply to rate. Ctrl+N starts a new chat.");
    help.push_str("\nAliases: /q for /quit, /n for /new, /s for /switch, /d for /delete.");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_is_not_command() {
        assert_eq!(parse_slash_command("hello /new"), None);
        assert_eq!(parse_slash_command("/unknown"), None);
    }

    #[test]
    fn test_parse_with_argument() {
        let parsed = parse_slash_command("/switch 3").unwrap();
        assert_eq!(parsed.command, SlashCommand::Switch);
        assert_eq!(parsed.chat_index(), Some(2));

        let parsed = parse_slash_command("/delete").unwrap();
        assert_eq!(parsed.command, SlashCommand::Delete);
        assert_eq!(parsed.chat_index(), None);
    }

    #[test]
    fn test_parse_zero_index_is_rejected() {
        let parsed = parse_slash_command("/s 0").unwrap();
        assert_eq!(parsed.chat_index(), None);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(parse_slash_command("/q").unwrap().command, SlashCommand::Quit);
        assert_eq!(parse_slash_command("/EXIT").unwrap().command, SlashCommand::Quit);
        assert_eq!(parse_slash_command("/d 2").unwrap().command, SlashCommand::Delete);
    }

    #[test]
    fn test_feedback_commands() {
        let parsed = parse_slash_command("/not-helpful").unwrap();
        assert_eq!(parsed.feedback_tag(), Some(FeedbackTag::NotHelpful));
        assert_eq!(parse_slash_command("/helpful").unwrap().feedback_tag(), Some(FeedbackTag::Helpful));
        assert_eq!(parse_slash_command("/new").unwrap().feedback_tag(), None);
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
    }
}
