//! Terminal user interface
//!
//! A full-screen story view driven by the session task through
//! [`crate::protocol`] messages.

mod app;
mod input;
mod shimmer;
mod slash_commands;
mod theme;
mod widgets;

pub use app::App;
pub use slash_commands::{help_text, parse_command, StoryCommand};
pub use theme::Theme;
