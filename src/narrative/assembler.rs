//! Renders the narrative template, the turn history and the latest input
//! into one generation prompt

use super::template::{NarrativeTemplate, Segment, Slot};
use crate::turn_log::Turn;
use std::sync::Arc;

/// Pure prompt renderer. Identical history and input always render to
/// identical text; no history is truncated or summarized.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    template: Arc<NarrativeTemplate>,
}

impl ContextAssembler {
    pub fn new(template: Arc<NarrativeTemplate>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &NarrativeTemplate {
        &self.template
    }

    /// Render each turn as `<label>: <text>`, oldest first, one per line.
    pub fn render_history(history: &[Turn]) -> String {
        history
            .iter()
            .map(|t| format!("{}: {}", t.role.label(), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the prompt for the next narrator turn.
    pub fn render(&self, history: &[Turn], human_input: &str) -> String {
        let chat_history = Self::render_history(history);

        let mut prompt = String::with_capacity(
            self.template.source().len() + chat_history.len() + human_input.len(),
        );
        for segment in self.template.segments() {
            match segment {
                Segment::Literal(text) => prompt.push_str(text),
                Segment::Slot(Slot::ChatHistory) => prompt.push_str(&chat_history),
                Segment::Slot(Slot::HumanInput) => prompt.push_str(human_input),
            }
        }
        prompt
    }
}
