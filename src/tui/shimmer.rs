//! Busy animations: a highlight sweeping across the title and a braille spinner

use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

const SWEEP_SECONDS: f32 = 2.0;
const PADDING: usize = 10;
const BAND_HALF_WIDTH: f32 = 5.0;

fn elapsed_since_start() -> Duration {
    PROCESS_START.get_or_init(Instant::now).elapsed()
}

/// Spans for `text` with a bright band at the current sweep position
pub fn shimmer_spans(text: &str) -> Vec<Span<'static>> {
    shimmer_spans_at(text, elapsed_since_start())
}

fn shimmer_spans_at(text: &str, elapsed: Duration) -> Vec<Span<'static>> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let period = chars.len() + PADDING * 2;
    let phase = (elapsed.as_secs_f32() % SWEEP_SECONDS) / SWEEP_SECONDS;
    let pos = (phase * period as f32) as isize;

    chars
        .iter()
        .enumerate()
        .map(|(i, ch)| {
            let dist = ((i + PADDING) as isize - pos).abs() as f32;
            let intensity = if dist <= BAND_HALF_WIDTH {
                let x = std::f32::consts::PI * (dist / BAND_HALF_WIDTH);
                0.5 * (1.0 + x.cos())
            } else {
                0.0
            };
            Span::styled(ch.to_string(), style_for_intensity(intensity))
        })
        .collect()
}

fn style_for_intensity(intensity: f32) -> Style {
    if intensity < 0.2 {
        Style::default().add_modifier(Modifier::DIM)
    } else if intensity < 0.6 {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

/// Spinner frame for the status bar
pub struct Spinner {
    frame: usize,
}

impl Spinner {
    const FRAMES: &'static [&'static str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

    pub fn new(frame: usize) -> Self {
        Self { frame }
    }

    pub fn current(&self) -> &'static str {
        Self::FRAMES[self.frame % Self::FRAMES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shimmer_keeps_every_char() {
        let spans = shimmer_spans_at("Whispering Woods", Duration::from_millis(700));
        let joined: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, "Whispering Woods");
    }

    #[test]
    fn test_shimmer_empty() {
        assert!(shimmer_spans_at("", Duration::ZERO).is_empty());
    }

    #[test]
    fn test_spinner_wraps() {
        assert_eq!(Spinner::new(0).current(), Spinner::new(10).current());
    }
}
