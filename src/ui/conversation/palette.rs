//! Slash-command autocomplete.
//!
//! The palette is visible exactly while the input starts with `/` and holds no
//! whitespace. The highlighted entry is the first suggestion, in declared order,
//! whose prefix starts with the input. No fuzzy matching or ranking.

use crossterm::event::{KeyCode, KeyEvent};
use tracing::debug;

use crate::ui::conversation::commands::CommandSuggestion;

/// Snapshot handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteState {
    pub visible: bool,
    /// `None` means no match is highlighted
    pub highlighted: Option<usize>,
}

/// What the palette did with a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteKey {
    /// A suggestion was picked; the input buffer must become this text
    Commit(String),
    /// Handled by the palette; the key has no further effect
    Consumed,
    /// Not a palette key, or the palette is closed
    PassThrough,
}

#[derive(Debug, Clone)]
pub struct CommandPalette {
    suggestions: Vec<CommandSuggestion>,
    state: PaletteState,
}

/// Whether `text` should open the palette
pub fn is_command_intent(text: &str) -> bool {
    text.starts_with('/') && !text.chars().any(char::is_whitespace)
}

impl CommandPalette {
    pub fn new(suggestions: Vec<CommandSuggestion>) -> Self {
        Self {
            suggestions,
            state: PaletteState::default(),
        }
    }

    pub fn suggestions(&self) -> &[CommandSuggestion] {
        &self.suggestions
    }

    pub fn state(&self) -> PaletteState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.state.highlighted
    }

    /// Re-run intent detection; call after every change to the input buffer.
    pub fn on_text_change(&mut self, text: &str) {
        let was_visible = self.state.visible;

        if is_command_intent(text) {
            self.state.visible = true;
            self.state.highlighted = self
                .suggestions
                .iter()
                .position(|suggestion| suggestion.prefix.starts_with(text));
        } else {
            self.state = PaletteState::default();
        }

        if was_visible != self.state.visible {
            debug!(visible = self.state.visible, "command palette toggled");
        }
    }

    /// Keyboard contract. Only active while visible.
    pub fn handle_key(&mut self, key: KeyEvent) -> PaletteKey {
        if !self.state.visible {
            return PaletteKey::PassThrough;
        }

        match key.code {
            KeyCode::Down => {
                self.move_selection(1);
                PaletteKey::Consumed
            }
            KeyCode::Up => {
                self.move_selection(-1);
                PaletteKey::Consumed
            }
            KeyCode::Tab | KeyCode::Enter => match self.state.highlighted {
                Some(index) => self.select(index).map_or(PaletteKey::PassThrough, PaletteKey::Commit),
                None => PaletteKey::PassThrough,
            },
            KeyCode::Esc => {
                self.dismiss();
                PaletteKey::Consumed
            }
            _ => PaletteKey::PassThrough,
        }
    }

    /// Cyclic navigation. From no highlight, down lands on the first entry and up on the last.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.suggestions.len() as isize;
        if len == 0 {
            return;
        }

        let next = match self.state.highlighted {
            Some(current) => (current as isize + delta).rem_euclid(len),
            None if delta >= 0 => (delta - 1).rem_euclid(len),
            None => delta.rem_euclid(len),
        };

        self.state.highlighted = Some(next as usize);
    }

    /// Commit a suggestion by index (keyboard or pointer). Returns the new buffer text.
    pub fn select(&mut self, index: usize) -> Option<String> {
        let text = self.suggestions.get(index)?.committed_text();
        debug!(prefix = %self.suggestions[index].prefix, "command committed");
        self.state = PaletteState::default();
        Some(text)
    }

    /// Close without touching the input buffer
    pub fn dismiss(&mut self) {
        self.state = PaletteState::default();
    }
}
