//! Narrative rule template with `{chat_history}` and `{human_input}` slots

use super::{termination_marker, TERMINATION_MARKER};
use crate::{Result, StoryError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Built-in rules: the Whispering Woods quest.
pub const DEFAULT_TEMPLATE: &str = concat!(
    r#"
You are now the guide of a mystical journey in the Whispering Woods.
A traveler named Elara seeks the lost Gem of Serenity.
You must navigate her through challenges, choices, and consequences,
dynamically adapting the tale based on the traveler's decisions.
Your goal is to create a branching narrative experience where each choice
leads to a new path, ultimately determining Elara's fate.

Here are some rules to follow:
1. Start by asking the player to choose some kind of weapons that will be used later in the game
2. Have a few paths that lead to success
3. Have some paths that lead to death. If the user dies generate a response that explains the death and ends in the text: ""#,
    termination_marker!(),
    r#"", I will search for this text to end the game

Here is the chat history, use this to understand what to say next: {chat_history}
Human: {human_input}
AI:"#
);

/// A named placeholder in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    ChatHistory,
    HumanInput,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::ChatHistory => "chat_history",
            Slot::HumanInput => "human_input",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Segment {
    Literal(String),
    Slot(Slot),
}

/// Parsed, immutable narrative template.
///
/// Only `{chat_history}` and `{human_input}` are placeholders; any other
/// braces are kept as literal text.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeTemplate {
    source: String,
    segments: Vec<Segment>,
}

fn slot_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(chat_history|human_input)\}").expect("static slot regex"))
}

impl NarrativeTemplate {
    /// Parse template text. Both slots must appear at least once.
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let segments = split_segments(&source);

        for slot in [Slot::ChatHistory, Slot::HumanInput] {
            if !segments.contains(&Segment::Slot(slot)) {
                return Err(StoryError::Template(format!(
                    "missing {{{}}} placeholder",
                    slot.name()
                )));
            }
        }

        if !source.contains(TERMINATION_MARKER) {
            warn!(
                "Template never mentions {:?}; stories will not be detected as finished",
                TERMINATION_MARKER
            );
        }

        Ok(Self { source, segments })
    }

    /// Load and parse a template file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            StoryError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        let template = Self::parse(content)?;
        info!("Loaded narrative template from {}", path.display());
        Ok(template)
    }

    /// Raw template text
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(super) fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl Default for NarrativeTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            segments: split_segments(DEFAULT_TEMPLATE),
        }
    }
}

fn split_segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in slot_regex().captures_iter(source) {
        let Some(m) = caps.get(0) else { continue };
        if m.start() > last {
            segments.push(Segment::Literal(source[last..m.start()].to_string()));
        }
        let slot = match &caps[1] {
            "chat_history" => Slot::ChatHistory,
            _ => Slot::HumanInput,
        };
        segments.push(Segment::Slot(slot));
        last = m.end();
    }
    if last < source.len() {
        segments.push(Segment::Literal(source[last..].to_string()));
    }

    segments
}
