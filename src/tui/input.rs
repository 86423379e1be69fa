//! Input line editing for the TUI

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

/// Result of handling a key event
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// No action needed
    None,
    /// Submit the current input
    Submit(String),
    /// Quit the application
    Quit,
    /// Restart the story
    Reset,
    /// Scroll the transcript up
    ScrollUp,
    /// Scroll the transcript down
    ScrollDown,
    /// Buffer or cursor changed
    Edited,
}

/// Input state manager
///
/// Note: `cursor` is a CHARACTER index, not a byte index, so multi-byte
/// characters are edited correctly.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current input buffer
    pub buffer: String,
    /// Cursor position in buffer (character index)
    pub cursor: usize,
    /// Previously submitted inputs
    pub history: Vec<String>,
    /// Position while browsing history; `None` means editing fresh input
    history_index: Option<usize>,
    /// Fresh input saved while browsing history
    saved_input: String,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn char_to_byte_index(&self, char_idx: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_idx)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }

    fn insert_char(&mut self, c: char) {
        let byte_idx = self.char_to_byte_index(self.cursor);
        self.buffer.insert(byte_idx, c);
        self.cursor += 1;
    }

    fn remove_char_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_idx = self.char_to_byte_index(self.cursor);
            self.buffer.remove(byte_idx);
        }
    }

    fn remove_char_at_cursor(&mut self) {
        if self.cursor < self.char_count() {
            let byte_idx = self.char_to_byte_index(self.cursor);
            self.buffer.remove(byte_idx);
        }
    }

    /// Handle a key event and return the action
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => InputAction::Quit,
            KeyCode::Char('r') if ctrl => InputAction::Reset,

            KeyCode::Enter => {
                if self.buffer.trim().is_empty() {
                    return InputAction::None;
                }
                let input = std::mem::take(&mut self.buffer);
                self.history.push(input.clone());
                self.cursor = 0;
                self.history_index = None;
                InputAction::Submit(input)
            }

            KeyCode::Backspace => {
                self.remove_char_before_cursor();
                InputAction::Edited
            }
            KeyCode::Delete => {
                self.remove_char_at_cursor();
                InputAction::Edited
            }
            KeyCode::Char('u') if ctrl => {
                self.buffer.clear();
                self.cursor = 0;
                InputAction::Edited
            }
            KeyCode::Char('w') if ctrl => {
                self.delete_word();
                InputAction::Edited
            }

            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputAction::Edited
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
                InputAction::Edited
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::Edited
            }
            KeyCode::Char('a') if ctrl => {
                self.cursor = 0;
                InputAction::Edited
            }
            KeyCode::End => {
                self.cursor = self.char_count();
                InputAction::Edited
            }
            KeyCode::Char('e') if ctrl => {
                self.cursor = self.char_count();
                InputAction::Edited
            }

            KeyCode::Up => {
                self.history_prev();
                InputAction::Edited
            }
            KeyCode::Down => {
                self.history_next();
                InputAction::Edited
            }
            KeyCode::PageUp => InputAction::ScrollUp,
            KeyCode::PageDown => InputAction::ScrollDown,

            KeyCode::Char(c) if !ctrl => {
                self.insert_char(c);
                InputAction::Edited
            }

            _ => InputAction::None,
        }
    }

    /// Replace the buffer, e.g. to restore input after a failed turn
    pub fn set_buffer(&mut self, content: &str) {
        self.buffer = content.to_string();
        self.cursor = self.char_count();
    }

    fn delete_word(&mut self) {
        while self.cursor > 0 && self.char_before_cursor() == Some(' ') {
            self.remove_char_before_cursor();
        }
        while self.cursor > 0 && self.char_before_cursor() != Some(' ') {
            self.remove_char_before_cursor();
        }
    }

    fn char_before_cursor(&self) -> Option<char> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.buffer.chars().nth(i))
    }

    fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next = match self.history_index {
            None => {
                self.saved_input = self.buffer.clone();
                self.history.len() - 1
            }
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.history_index = Some(next);
        self.buffer = self.history[next].clone();
        self.cursor = self.char_count();
    }

    fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(i) if i + 1 < self.history.len() => {
                self.history_index = Some(i + 1);
                self.buffer = self.history[i + 1].clone();
            }
            Some(_) => {
                self.history_index = None;
                self.buffer = std::mem::take(&mut self.saved_input);
            }
        }
        self.cursor = self.char_count();
    }

    /// Cursor position in terminal columns (wide characters take two)
    pub fn cursor_display_width(&self) -> usize {
        self.buffer
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(state: &mut InputState, text: &str) {
        for c in text.chars() {
            state.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_insert_unicode() {
        let mut state = InputState::new();
        type_str(&mut state, "h\u{4f60}\u{597d}");
        assert_eq!(state.buffer, "h\u{4f60}\u{597d}");
        assert_eq!(state.cursor, 3);
        assert_eq!(state.cursor_display_width(), 5);
    }

    #[test]
    fn test_backspace_unicode() {
        let mut state = InputState::new();
        type_str(&mut state, "\u{4f60}\u{597d}");
        state.handle_key(key(KeyCode::Backspace));
        assert_eq!(state.buffer, "\u{4f60}");
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_submit_clears_buffer() {
        let mut state = InputState::new();
        type_str(&mut state, "I draw my sword.");
        assert_eq!(
            state.handle_key(key(KeyCode::Enter)),
            InputAction::Submit("I draw my sword.".to_string())
        );
        assert!(state.buffer.is_empty());
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_blank_enter_does_nothing() {
        let mut state = InputState::new();
        type_str(&mut state, "   ");
        assert_eq!(state.handle_key(key(KeyCode::Enter)), InputAction::None);
        assert_eq!(state.buffer, "   ");
    }

    #[test]
    fn test_delete_word() {
        let mut state = InputState::new();
        type_str(&mut state, "take the bow  ");
        state.handle_key(ctrl('w'));
        assert_eq!(state.buffer, "take the ");
    }

    #[test]
    fn test_history_roundtrip() {
        let mut state = InputState::new();
        type_str(&mut state, "north");
        state.handle_key(key(KeyCode::Enter));
        type_str(&mut state, "east");
        state.handle_key(key(KeyCode::Enter));
        type_str(&mut state, "dra");

        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.buffer, "east");
        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.buffer, "north");
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.buffer, "east");
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.buffer, "dra");
    }

    #[test]
    fn test_control_keys() {
        let mut state = InputState::new();
        assert_eq!(state.handle_key(ctrl('r')), InputAction::Reset);
        assert_eq!(state.handle_key(ctrl('c')), InputAction::Quit);
        assert!(state.buffer.is_empty());
    }
}
