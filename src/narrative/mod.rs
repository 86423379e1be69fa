//! Narrative rules, prompt assembly and end-of-story detection
//!
//! The template instructs the narrator to finish a story with a fixed
//! marker, and the detector searches for that same marker. Both read it
//! from [`TERMINATION_MARKER`], which is also spliced into the built-in
//! template text at compile time.

mod assembler;
mod template;

pub use assembler::ContextAssembler;
pub use template::{NarrativeTemplate, Slot, DEFAULT_TEMPLATE};

/// Expands to the end-of-story marker literal so it can be used in `concat!`.
macro_rules! termination_marker {
    () => {
        "The End."
    };
}
pub(crate) use termination_marker;

/// Literal the narrator must emit when the story ends. Case-sensitive.
pub const TERMINATION_MARKER: &str = termination_marker!();

/// Input used for the opening turn, before the player has typed anything.
pub const START_SENTINEL: &str = "start";

/// Whether a narrator turn ends the story.
///
/// Exact substring match only: an ending that paraphrases the marker
/// ("the end", "THE END") is not terminal.
pub fn is_terminal(text: &str) -> bool {
    text.contains(TERMINATION_MARKER)
}
