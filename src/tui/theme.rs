//! Story colors, keyed by who is speaking and what the session is doing.
//! ANSI colors only, so the terminal palette picks the actual shades.

use ratatui::style::{Color, Modifier, Style};

/// Owner of a transcript block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Player,
    Narrator,
    /// The narration that closed the story
    Ending,
}

impl Voice {
    fn color(self) -> Color {
        match self {
            Voice::Player => Color::Cyan,
            Voice::Narrator => Color::Magenta,
            Voice::Ending => Color::Yellow,
        }
    }
}

/// Tone of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Progress,
    Ok,
    Attention,
    Failure,
}

pub struct Theme;

impl Theme {
    /// Inverted label above a transcript block
    pub fn badge(voice: Voice) -> Style {
        Style::default()
            .bg(voice.color())
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    }

    /// Body text of a transcript block. Narration stays in the terminal's
    /// own foreground so long passages remain easy to read.
    pub fn speech(voice: Voice) -> Style {
        match voice {
            Voice::Player => Style::default().fg(voice.color()),
            Voice::Narrator | Voice::Ending => Style::default(),
        }
    }

    pub fn signal(signal: Signal) -> Style {
        let color = match signal {
            Signal::Progress => Color::Cyan,
            Signal::Ok => Color::Green,
            Signal::Attention => Color::Yellow,
            Signal::Failure => Color::Red,
        };
        Style::default().fg(color)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    /// Borders, placeholders and other furniture around the story
    pub fn chrome() -> Style {
        Style::default().fg(Color::DarkGray)
    }

    pub fn frame(focused: bool) -> Style {
        if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Self::chrome()
        }
    }

    pub fn hint() -> Style {
        Style::default().add_modifier(Modifier::DIM)
    }

    /// Out-of-story text such as `/help` output
    pub fn notice() -> Style {
        Self::hint().add_modifier(Modifier::ITALIC)
    }

    pub fn key() -> Style {
        Self::title()
    }
}
