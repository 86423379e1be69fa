//! Slash commands typed into the input line

use std::fmt;

/// Commands handled by the front end instead of the narrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryCommand {
    Help,
    Reset,
    Quit,
}

impl StoryCommand {
    pub fn all() -> &'static [StoryCommand] {
        &[StoryCommand::Help, StoryCommand::Reset, StoryCommand::Quit]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoryCommand::Help => "help",
            StoryCommand::Reset => "reset",
            StoryCommand::Quit => "quit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StoryCommand::Help => "show commands and keys",
            StoryCommand::Reset => "erase this story and start a new one",
            StoryCommand::Quit => "leave the game",
        }
    }

    pub fn parse(name: &str) -> Option<StoryCommand> {
        let name = name.to_lowercase();
        match name.as_str() {
            "exit" => Some(StoryCommand::Quit),
            "restart" | "new" => Some(StoryCommand::Reset),
            _ => Self::all().iter().find(|cmd| cmd.name() == name).copied(),
        }
    }
}

impl fmt::Display for StoryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// Parse `/command`. Returns `None` for ordinary story input.
pub fn parse_command(input: &str) -> Option<StoryCommand> {
    let rest = input.trim().strip_prefix('/')?;
    let name = rest.split_whitespace().next()?;
    StoryCommand::parse(name)
}

/// One help line per command
pub fn help_text() -> String {
    StoryCommand::all()
        .iter()
        .map(|cmd| format!("{:<8} {}", cmd.to_string(), cmd.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/reset"), Some(StoryCommand::Reset));
        assert_eq!(parse_command("  /QUIT "), Some(StoryCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(StoryCommand::Quit));
        assert_eq!(parse_command("/help me"), Some(StoryCommand::Help));
    }

    #[test]
    fn test_story_text_is_not_a_command() {
        assert_eq!(parse_command("I reset the trap"), None);
        assert_eq!(parse_command("/dance"), None);
        assert_eq!(parse_command("/"), None);
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for cmd in StoryCommand::all() {
            assert!(help.contains(&cmd.to_string()));
        }
    }
}
