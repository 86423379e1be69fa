//! Main TUI application

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyEvent, MouseEvent, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    text::Line,
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::input::{InputAction, InputState};
use super::slash_commands::{help_text, parse_command, StoryCommand};
use super::theme::Theme;
use super::widgets::{
    render_exchange_lines, render_notice_lines, HeaderBar, HelpBar, InputBox, StatusBar,
    StatusKind,
};
use crate::protocol::{SurfaceCommand, SurfaceEvent};
use crate::session::Exchange;

const SCROLL_STEP: usize = 3;
const PAGE_STEP: usize = 10;

/// Everything the screen shows, updated from key presses and session events.
#[derive(Debug, Default)]
pub(crate) struct StoryView {
    pub exchanges: Vec<Exchange>,
    /// Player text sent but not yet answered
    pub pending: Option<String>,
    pub notice: Option<String>,
    pub error: Option<String>,
    pub is_busy: bool,
    pub terminated: bool,
    pub scroll_offset: usize,
}

impl StoryView {
    /// Apply one event from the session task. Returns input to restore, if any.
    pub fn apply_event(&mut self, event: SurfaceEvent) -> Option<String> {
        match event {
            SurfaceEvent::Busy => {
                self.is_busy = true;
                self.error = None;
                None
            }
            SurfaceEvent::Transcript {
                exchanges,
                terminated,
            } => {
                self.exchanges = exchanges;
                self.terminated = terminated;
                self.is_busy = false;
                self.pending = None;
                self.scroll_offset = 0;
                None
            }
            SurfaceEvent::Failed { message, input } => {
                self.is_busy = false;
                self.pending = None;
                self.error = Some(message);
                input
            }
        }
    }

    fn status(&self) -> StatusKind {
        if self.is_busy {
            StatusKind::Busy
        } else if let Some(err) = &self.error {
            StatusKind::Error(err.clone())
        } else if self.terminated {
            StatusKind::Ended
        } else if self.exchanges.is_empty() {
            StatusKind::NotStarted
        } else {
            StatusKind::Ready
        }
    }

    /// Player input needs an opened, unfinished story and no turn in flight.
    fn can_submit(&self) -> bool {
        !self.is_busy && !self.terminated && !self.exchanges.is_empty()
    }

    fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for exchange in &self.exchanges {
            lines.extend(render_exchange_lines(exchange, width));
        }
        if let Some(pending) = &self.pending {
            let preview = Exchange {
                human: Some(pending.clone()),
                narrator: "...".to_string(),
            };
            lines.extend(render_exchange_lines(&preview, width));
        }
        if let Some(notice) = &self.notice {
            lines.extend(render_notice_lines(notice, width));
        }
        lines
    }
}

/// Full-screen story client talking to the session task over channels.
pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    input: InputState,
    view: StoryView,
    spinner_frame: usize,
    session_label: String,
    backend_label: String,
    should_quit: bool,
    commands: mpsc::Sender<SurfaceCommand>,
    events: mpsc::Receiver<SurfaceEvent>,
}

impl App {
    pub fn new(
        session_label: String,
        backend_label: String,
        commands: mpsc::Sender<SurfaceCommand>,
        events: mpsc::Receiver<SurfaceEvent>,
    ) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, crossterm::event::EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            input: InputState::new(),
            view: StoryView {
                is_busy: true,
                ..StoryView::default()
            },
            spinner_frame: 0,
            session_label,
            backend_label,
            should_quit: false,
            commands,
            events,
        })
    }

    /// Run the main event loop
    pub async fn run(&mut self) -> io::Result<()> {
        let poll_timeout = Duration::from_millis(16);
        let spinner_interval = Duration::from_millis(80);
        let mut last_spinner_update = Instant::now();

        while !self.should_quit {
            self.drain_events();

            if last_spinner_update.elapsed() >= spinner_interval {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                last_spinner_update = Instant::now();
            }

            self.draw()?;

            if event::poll(poll_timeout)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key).await,
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    debug!("Surface event: {:?}", event);
                    if let Some(input) = self.view.apply_event(event) {
                        self.input.set_buffer(&input);
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    warn!("Session task went away");
                    self.should_quit = true;
                    break;
                }
            }
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        match self.input.handle_key(key) {
            InputAction::Quit => self.should_quit = true,
            InputAction::Reset => self.restart().await,
            InputAction::ScrollUp => {
                self.view.scroll_offset = self.view.scroll_offset.saturating_add(PAGE_STEP);
            }
            InputAction::ScrollDown => {
                self.view.scroll_offset = self.view.scroll_offset.saturating_sub(PAGE_STEP);
            }
            InputAction::Submit(text) => self.submit(text).await,
            InputAction::Edited | InputAction::None => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.view.scroll_offset = self.view.scroll_offset.saturating_add(SCROLL_STEP);
            }
            MouseEventKind::ScrollDown => {
                self.view.scroll_offset = self.view.scroll_offset.saturating_sub(SCROLL_STEP);
            }
            _ => {}
        }
    }

    async fn submit(&mut self, text: String) {
        self.view.notice = None;

        if let Some(cmd) = parse_command(&text) {
            match cmd {
                StoryCommand::Help => self.view.notice = Some(help_text()),
                StoryCommand::Reset => self.restart().await,
                StoryCommand::Quit => self.should_quit = true,
            }
            return;
        }

        if !self.view.can_submit() {
            // Keep what the player typed; the status bar explains why.
            self.input.set_buffer(&text);
            return;
        }

        self.view.pending = Some(text.clone());
        self.send(SurfaceCommand::Submit(text)).await;
    }

    async fn restart(&mut self) {
        if self.view.is_busy {
            return;
        }
        self.view.notice = None;
        self.view.exchanges.clear();
        self.view.terminated = false;
        self.send(SurfaceCommand::Open).await;
    }

    async fn send(&mut self, command: SurfaceCommand) {
        self.view.is_busy = true;
        if self.commands.send(command).await.is_err() {
            warn!("Session task is not accepting commands");
            self.should_quit = true;
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        let view = &self.view;
        let input = &self.input;
        let session = self.session_label.as_str();
        let backend = self.backend_label.as_str();
        let spinner_frame = self.spinner_frame;

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Header
                    Constraint::Length(1), // Status
                    Constraint::Min(8),    // Story
                    Constraint::Length(4), // Input
                    Constraint::Length(1), // Help
                ])
                .split(f.area());

            f.render_widget(
                HeaderBar {
                    title: "storyloop",
                    session,
                    backend,
                    is_busy: view.is_busy,
                },
                chunks[0],
            );
            f.render_widget(
                StatusBar {
                    kind: view.status(),
                    spinner_frame,
                },
                chunks[1],
            );

            Self::render_story(f, chunks[2], view);

            f.render_widget(
                InputBox {
                    content: &input.buffer,
                    focused: view.can_submit(),
                    closed: view.terminated || view.exchanges.is_empty(),
                },
                chunks[3],
            );
            let cursor_x = chunks[3].x + 1 + input.cursor_display_width() as u16;
            f.set_cursor_position((
                cursor_x.min(chunks[3].x + chunks[3].width.saturating_sub(2)),
                chunks[3].y + 1,
            ));

            f.render_widget(HelpBar, chunks[4]);
        })?;

        Ok(())
    }

    fn render_story(f: &mut Frame, area: Rect, view: &StoryView) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::frame(false))
            .title_top(Line::styled(" Story ", Theme::chrome()));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let all_lines = view.lines(inner.width as usize);

        // Scroll offset counts lines up from the bottom.
        let total_lines = all_lines.len();
        let visible_height = inner.height as usize;
        let max_scroll = total_lines.saturating_sub(visible_height);
        let actual_scroll = view.scroll_offset.min(max_scroll);
        let start = max_scroll.saturating_sub(actual_scroll);

        let visible: Vec<Line> = all_lines
            .into_iter()
            .skip(start)
            .take(visible_height)
            .collect();
        f.render_widget(Paragraph::new(visible).wrap(Wrap { trim: false }), inner);

        if total_lines > visible_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut state =
                ScrollbarState::new(max_scroll).position(max_scroll.saturating_sub(actual_scroll));
            f.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut state,
            );
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            crossterm::event::DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(human: Option<&str>, narrator: &str) -> Exchange {
        Exchange {
            human: human.map(str::to_string),
            narrator: narrator.to_string(),
        }
    }

    #[test]
    fn test_transcript_event_replaces_view() {
        let mut view = StoryView {
            pending: Some("look around".into()),
            is_busy: true,
            scroll_offset: 7,
            ..StoryView::default()
        };
        let restore = view.apply_event(SurfaceEvent::Transcript {
            exchanges: vec![exchange(None, "You wake."), exchange(Some("look around"), "Trees.")],
            terminated: false,
        });

        assert_eq!(restore, None);
        assert_eq!(view.exchanges.len(), 2);
        assert!(view.pending.is_none());
        assert!(!view.is_busy);
        assert_eq!(view.scroll_offset, 0);
        assert_eq!(view.status(), StatusKind::Ready);
    }

    #[test]
    fn test_failure_restores_input_and_keeps_transcript() {
        let mut view = StoryView {
            exchanges: vec![exchange(None, "You wake.")],
            pending: Some("run".into()),
            is_busy: true,
            ..StoryView::default()
        };
        let restore = view.apply_event(SurfaceEvent::Failed {
            message: "generation unavailable: connection refused".into(),
            input: Some("run".into()),
        });

        assert_eq!(restore.as_deref(), Some("run"));
        assert_eq!(view.exchanges.len(), 1);
        assert!(view.pending.is_none());
        assert!(matches!(view.status(), StatusKind::Error(_)));
    }

    #[test]
    fn test_terminated_story_blocks_submission() {
        let mut view = StoryView::default();
        view.apply_event(SurfaceEvent::Transcript {
            exchanges: vec![exchange(None, "It was all a dream. The End.")],
            terminated: true,
        });
        assert!(!view.can_submit());
        assert_eq!(view.status(), StatusKind::Ended);

        view.apply_event(SurfaceEvent::Busy);
        assert_eq!(view.status(), StatusKind::Busy);
    }

    #[test]
    fn test_failed_opening_blocks_submission() {
        let mut view = StoryView {
            is_busy: true,
            ..StoryView::default()
        };
        let restore = view.apply_event(SurfaceEvent::Failed {
            message: "generation unavailable: connection refused".into(),
            input: None,
        });

        assert_eq!(restore, None);
        assert!(!view.can_submit());

        view.error = None;
        assert_eq!(view.status(), StatusKind::NotStarted);

        view.apply_event(SurfaceEvent::Transcript {
            exchanges: vec![exchange(None, "A forest.")],
            terminated: false,
        });
        assert!(view.can_submit());
    }

    #[test]
    fn test_pending_input_is_previewed() {
        let view = StoryView {
            exchanges: vec![exchange(None, "You wake.")],
            pending: Some("stand up".into()),
            ..StoryView::default()
        };
        let text: Vec<String> = view
            .lines(80)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(text.iter().any(|l| l == "  stand up"));
    }
}
