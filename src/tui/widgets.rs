//! Widgets for the story screen

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use regex::Regex;
use std::sync::OnceLock;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::shimmer::{shimmer_spans, Spinner};
use super::theme::{Signal, Theme, Voice};
use crate::narrative::TERMINATION_MARKER;
use crate::session::Exchange;

fn emphasis_patterns() -> &'static [(Regex, Modifier)] {
    static PATTERNS: OnceLock<Vec<(Regex, Modifier)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"\*\*\*(.+?)\*\*\*", Modifier::BOLD | Modifier::ITALIC),
            (r"\*\*(.+?)\*\*", Modifier::BOLD),
            (r"\*([^*]+?)\*", Modifier::ITALIC),
            (r"_([^_]+?)_", Modifier::ITALIC),
        ]
        .into_iter()
        .filter_map(|(pattern, modifier)| Regex::new(pattern).ok().map(|re| (re, modifier)))
        .collect()
    })
}

/// Styled spans for narration with `*emphasis*` markup.
/// Models like to italicize thoughts and bold names.
fn parse_emphasis(text: &str, base_style: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let first = emphasis_patterns()
            .iter()
            .filter_map(|(re, modifier)| re.captures(remaining).map(|caps| (caps, *modifier)))
            .min_by_key(|(caps, _)| caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX));

        let Some((caps, modifier)) = first else {
            spans.push(Span::styled(remaining.to_string(), base_style));
            break;
        };
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        if whole.start() > 0 {
            spans.push(Span::styled(remaining[..whole.start()].to_string(), base_style));
        }
        spans.push(Span::styled(
            inner.as_str().to_string(),
            base_style.add_modifier(modifier),
        ));
        remaining = &remaining[whole.end()..];
    }

    spans
}

/// Word-wrap `text` to `max_width` columns. Words wider than a line are
/// broken by character.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 || text.width() <= max_width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split(' ') {
        let word_width = word.width();
        let sep = usize::from(!current.is_empty());

        if current_width + sep + word_width <= max_width {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_width += sep + word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if word_width <= max_width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        for c in word.chars() {
            let w = c.width().unwrap_or(0);
            if current_width + w > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += w;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Header bar with title and session info
pub struct HeaderBar<'a> {
    pub title: &'a str,
    pub session: &'a str,
    pub backend: &'a str,
    pub is_busy: bool,
}

impl Widget for HeaderBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let mut title_spans = vec![Span::styled("◆ ", Theme::title())];
        if self.is_busy {
            title_spans.extend(shimmer_spans(self.title));
        } else {
            title_spans.push(Span::styled(self.title, Theme::title()));
        }
        buf.set_line(
            area.x + 1,
            area.y,
            &Line::from(title_spans),
            area.width.saturating_sub(2),
        );

        let info = format!("{} · {} ", self.session, self.backend);
        let info_len = info.width() as u16;
        let info_x = area.x + area.width.saturating_sub(info_len + 1);
        buf.set_span(info_x, area.y, &Span::styled(info, Theme::chrome()), info_len + 1);
    }
}

/// What the status bar should say
#[derive(Debug, Clone, PartialEq)]
pub enum StatusKind {
    Ready,
    Busy,
    NotStarted,
    Ended,
    Error(String),
}

/// Status bar showing current state
pub struct StatusBar {
    pub kind: StatusKind,
    pub spinner_frame: usize,
}

impl Widget for StatusBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = match self.kind {
            StatusKind::Busy => Line::from(vec![
                Span::styled(
                    format!("{} ", Spinner::new(self.spinner_frame).current()),
                    Theme::signal(Signal::Progress),
                ),
                Span::styled("The narrator is writing...", Theme::signal(Signal::Progress)),
            ]),
            StatusKind::Ready => Line::from(vec![
                Span::styled("● ", Theme::signal(Signal::Ok)),
                Span::styled("Your move", Theme::hint()),
            ]),
            StatusKind::NotStarted => Line::from(vec![
                Span::styled("○ ", Theme::signal(Signal::Attention)),
                Span::styled("No story yet. Ctrl+R to begin", Theme::hint()),
            ]),
            StatusKind::Ended => Line::from(vec![
                Span::styled("■ ", Theme::signal(Signal::Attention)),
                Span::styled("The story has ended. Ctrl+R to begin again", Theme::hint()),
            ]),
            StatusKind::Error(message) => Line::from(vec![
                Span::styled("✗ ", Theme::signal(Signal::Failure)),
                Span::styled(message, Theme::signal(Signal::Failure)),
            ]),
        };

        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));
    }
}

/// Input box widget
pub struct InputBox<'a> {
    pub content: &'a str,
    pub focused: bool,
    /// No story is in progress (not opened yet, or already ended)
    pub closed: bool,
}

impl Widget for InputBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::frame(self.focused))
            .title(Span::styled(" What do you do? ", Theme::chrome()));

        let inner = block.inner(area);
        block.render(area, buf);

        let (display_text, style) = match (self.content.is_empty(), self.closed) {
            (false, _) => (self.content, Theme::speech(Voice::Player)),
            (true, true) => ("/reset to start a new story, /quit to leave", Theme::chrome()),
            (true, false) => ("Describe your action... (Enter to send, /help for commands)", Theme::chrome()),
        };

        Paragraph::new(display_text)
            .style(style)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

/// Help bar showing key bindings
pub struct HelpBar;

impl Widget for HelpBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bindings = [
            ("Enter", "Send"),
            ("PgUp/PgDn", "Scroll"),
            ("Ctrl+R", "Restart"),
            ("/help", "Commands"),
            ("Ctrl+C", "Quit"),
        ];

        let mut spans = vec![Span::raw(" ")];
        for (i, (key, desc)) in bindings.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", Theme::chrome()));
            }
            spans.push(Span::styled(*key, Theme::key()));
            spans.push(Span::styled(format!(" {}", desc), Theme::chrome()));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

fn push_wrapped(lines: &mut Vec<Line<'static>>, content: &str, style: Style, width: usize) {
    for paragraph in content.lines() {
        if paragraph.trim().is_empty() {
            lines.push(Line::from(""));
            continue;
        }
        for wrapped in wrap_text(paragraph, width) {
            let mut spans = vec![Span::raw("  ")];
            spans.extend(parse_emphasis(&wrapped, style));
            lines.push(Line::from(spans));
        }
    }
}

/// Lines for one exchange: the player's choice (if any), then the narration.
/// `max_width` is the terminal width (0 = no wrapping).
pub fn render_exchange_lines(exchange: &Exchange, max_width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let content_width = max_width.saturating_sub(4);

    if let Some(human) = &exchange.human {
        lines.push(Line::from(Span::styled(" You ", Theme::badge(Voice::Player))));
        push_wrapped(&mut lines, human, Theme::speech(Voice::Player), content_width);
        lines.push(Line::from(""));
    }

    let ended = exchange.narrator.contains(TERMINATION_MARKER);
    let (badge, voice) = if ended {
        (" Narrator · The End ", Voice::Ending)
    } else {
        (" Narrator ", Voice::Narrator)
    };
    lines.push(Line::from(Span::styled(badge, Theme::badge(voice))));
    push_wrapped(&mut lines, &exchange.narrator, Theme::speech(voice), content_width);
    lines.push(Line::from(""));

    lines
}

/// Multi-line notice shown in the transcript area, e.g. the `/help` text
pub fn render_notice_lines(text: &str, max_width: usize) -> Vec<Line<'static>> {
    let style = Theme::notice();
    let mut lines = Vec::new();
    for line in text.lines() {
        for wrapped in wrap_text(line, max_width.saturating_sub(4)) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(wrapped, style),
            ]));
        }
    }
    lines.push(Line::from(""));
    lines
}
