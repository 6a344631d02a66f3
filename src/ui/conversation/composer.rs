use crate::ui::conversation::commands::CommandSuggestion;
use crate::ui::conversation::palette::{CommandPalette, PaletteKey, PaletteState};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};
use std::cell::Cell;

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter outside the palette; the caller decides whether the buffer is sent
    Submit,
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Cursor position in chars
    pub cursor_position: usize,
}

impl TextAreaState {
    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.content.len(), |(index, _)| index)
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Input line plus the slash-command palette that watches it
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    busy: bool,
    palette: CommandPalette,
    palette_area: Cell<Option<Rect>>,
}

impl ConversationComposer {
    pub fn new(placeholder: String, suggestions: Vec<CommandSuggestion>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder,
            busy: false,
            palette: CommandPalette::new(suggestions),
            palette_area: Cell::new(None),
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match self.palette.handle_key(key) {
            PaletteKey::Commit(text) => {
                self.set_content(text);
                return ComposerResult::None;
            }
            PaletteKey::Consumed => return ComposerResult::None,
            PaletteKey::PassThrough => {}
        }

        let changed = match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.insert_char('\n');
                    true
                } else {
                    return ComposerResult::Submit;
                }
            }
            KeyCode::Char(c) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    false
                } else {
                    self.insert_char(c);
                    true
                }
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.state.cursor_position = self.state.cursor_position.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                if self.state.cursor_position < self.state.char_len() {
                    self.state.cursor_position += 1;
                }
                false
            }
            KeyCode::Home => {
                self.state.cursor_position = 0;
                false
            }
            KeyCode::End => {
                self.state.cursor_position = self.state.char_len();
                false
            }
            _ => false,
        };

        if changed {
            self.palette.on_text_change(&self.state.content);
        }

        ComposerResult::None
    }

    /// Insert a string at the cursor position (paste)
    pub fn insert_str(&mut self, text: &str) {
        let index = self.state.byte_index();
        self.state.content.insert_str(index, text);
        self.state.cursor_position += text.chars().count();
        self.palette.on_text_change(&self.state.content);
    }

    /// Replace the whole buffer and move the cursor to the end
    pub fn set_content(&mut self, text: String) {
        self.state.cursor_position = text.chars().count();
        self.state.content = text;
        self.palette.on_text_change(&self.state.content);
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, c: char) {
        let index = self.state.byte_index();
        self.state.content.insert(index, c);
        self.state.cursor_position += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.state.cursor_position > 0 {
            self.state.cursor_position -= 1;
            let index = self.state.byte_index();
            self.state.content.remove(index);
            true
        } else {
            false
        }
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.state.cursor_position < self.state.char_len() {
            let index = self.state.byte_index();
            self.state.content.remove(index);
            true
        } else {
            false
        }
    }

    /// Commit a suggestion picked with the pointer
    pub fn select_suggestion(&mut self, index: usize) -> bool {
        match self.palette.select(index) {
            Some(text) => {
                self.set_content(text);
                true
            }
            None => false,
        }
    }

    /// Close the palette if open; otherwise open it on an empty buffer by typing `/`
    pub fn toggle_palette(&mut self) {
        if self.palette.is_visible() {
            self.palette.dismiss();
        } else if self.state.content.is_empty() {
            self.set_content("/".to_string());
        }
    }

    /// Which palette entry, if any, is drawn at this terminal cell
    pub fn suggestion_at(&self, column: u16, row: u16) -> Option<usize> {
        if !self.palette.is_visible() {
            return None;
        }
        let area = self.palette_area.get()?;
        let inner = Block::default().borders(Borders::ALL).inner(area);
        let inside = column >= inner.x
            && column < inner.x + inner.width
            && row >= inner.y
            && row < inner.y + inner.height;
        if !inside {
            return None;
        }
        let index = usize::from(row - inner.y);
        (index < self.palette.suggestions().len()).then_some(index)
    }

    pub fn palette(&self) -> &CommandPalette {
        &self.palette
    }

    pub fn palette_state(&self) -> PaletteState {
        self.palette.state()
    }

    /// Reflect whether a reply is pending
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Get current content
    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.state = TextAreaState::default();
        self.palette.on_text_change("");
    }

    fn title(&self) -> &'static str {
        if self.busy {
            "⏳ Waiting for reply"
        } else {
            "💬 Message"
        }
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = &self.state;

        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .style(if self.busy {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::Green)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = state.content.clone();
            content.insert(state.byte_index(), '▌');

            // keep the cursor line in view when the text outgrows the box
            let lines: Vec<&str> = content.split('\n').collect();
            let skip = lines.len().saturating_sub(inner_area.height as usize);
            for (i, line_text) in lines.iter().skip(skip).enumerate() {
                let line = Line::from(vec![Span::raw(*line_text)]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if !self.palette.is_visible() {
            self.palette_area.set(None);
            return;
        }

        let suggestions = self.palette.suggestions();
        let palette_height = (suggestions.len().max(1) + 2) as u16;
        let palette_area = Rect {
            x: area.x,
            y: area.y.saturating_sub(palette_height),
            width: area.width,
            height: palette_height.min(area.y),
        };
        self.palette_area.set(Some(palette_area));

        Clear.render(palette_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Commands")
            .style(Style::default().fg(Color::Blue));
        let inner = block.inner(palette_area);
        block.render(palette_area, buf);

        if suggestions.is_empty() {
            let line = Line::from(Span::styled(
                "No commands configured",
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        let selected = self.palette.highlighted();
        for (index, suggestion) in suggestions.iter().enumerate() {
            if index >= inner.height as usize {
                break;
            }

            let style = if selected == Some(index) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let line = Line::from(vec![
                Span::styled(format!("{:<10}", suggestion.prefix), style),
                Span::styled(suggestion.label.as_str(), style),
                Span::styled(" — ", Style::default().fg(Color::DarkGray)),
                Span::styled(suggestion.description.as_str(), Style::default().fg(Color::Gray)),
            ]);

            buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::default_suggestions;

    fn composer() -> ConversationComposer {
        ConversationComposer::new("Type a message".to_string(), default_suggestions())
    }

    fn press(composer: &mut ConversationComposer, code: KeyCode) -> ComposerResult {
        composer.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            press(composer, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_slash_opens_palette() {
        let mut composer = composer();
        type_text(&mut composer, "/f");

        let state = composer.palette_state();
        assert!(state.visible);
        assert_eq!(state.highlighted, Some(1));
    }

    #[test]
    fn tab_commits_figma() {
        let mut composer = composer();
        type_text(&mut composer, "/f");

        assert_eq!(press(&mut composer, KeyCode::Tab), ComposerResult::None);
        assert_eq!(composer.content(), "/figma ");
        assert!(!composer.palette_state().visible);
    }

    #[test]
    fn enter_commits_instead_of_submitting_when_highlighted() {
        let mut composer = composer();
        type_text(&mut composer, "/p");

        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::None);
        assert_eq!(composer.content(), "/page ");

        // palette closed now, Enter submits
        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::Submit);
    }

    #[test]
    fn enter_without_match_submits() {
        let mut composer = composer();
        type_text(&mut composer, "/xyz");
        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::Submit);
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = composer();
        type_text(&mut composer, "line one");
        let result = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));

        assert_eq!(result, ComposerResult::None);
        type_text(&mut composer, "two");
        assert_eq!(composer.content(), "line one\ntwo");
    }

    #[test]
    fn escape_keeps_buffer() {
        let mut composer = composer();
        type_text(&mut composer, "/cl");
        press(&mut composer, KeyCode::Esc);

        assert_eq!(composer.content(), "/cl");
        assert!(!composer.palette_state().visible);

        // navigation keys are inert while hidden
        press(&mut composer, KeyCode::Down);
        assert_eq!(composer.palette_state().highlighted, None);
    }

    #[test]
    fn backspace_reopens_palette() {
        let mut composer = composer();
        type_text(&mut composer, "/page x");
        assert!(!composer.palette_state().visible);

        press(&mut composer, KeyCode::Backspace);
        press(&mut composer, KeyCode::Backspace);
        assert_eq!(composer.content(), "/page");
        assert!(composer.palette_state().visible);
        assert_eq!(composer.palette_state().highlighted, Some(2));
    }

    #[test]
    fn commit_replaces_any_prior_content() {
        let mut composer = composer();
        composer.set_content("/improv".to_string());
        composer.insert_str("e");
        assert!(composer.select_suggestion(0));

        assert_eq!(composer.content(), "/clone ");
        assert!(!composer.palette_state().visible);
    }

    #[test]
    fn multibyte_editing_keeps_char_boundaries() {
        let mut composer = composer();
        type_text(&mut composer, "héllo");
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Backspace);
        assert_eq!(composer.content(), "hllo");
    }

    #[test]
    fn toggle_palette_respects_buffer() {
        let mut composer = composer();
        composer.toggle_palette();
        assert_eq!(composer.content(), "/");
        assert!(composer.palette_state().visible);

        composer.toggle_palette();
        assert!(!composer.palette_state().visible);
        assert_eq!(composer.content(), "/");

        composer.set_content("hello".to_string());
        composer.toggle_palette();
        assert!(!composer.palette_state().visible);
    }

    #[test]
    fn render_draws_cursor_and_busy_border() {
        let mut composer = composer();
        type_text(&mut composer, "hey");
        press(&mut composer, KeyCode::Left);

        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);
        let row: String = (0..30).map(|x| buf.get(x, 1).symbol().to_string()).collect();
        assert!(row.contains("he▌y"));
        assert_eq!(buf.get(0, 0).fg, Color::Green);

        composer.set_busy(true);
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);
        assert_eq!(buf.get(0, 0).fg, Color::Gray);
    }

    #[test]
    fn pointer_hit_testing_uses_rendered_area() {
        let mut composer = composer();
        type_text(&mut composer, "/");

        let mut buf = Buffer::empty(Rect::new(0, 0, 60, 20));
        (&composer).render(Rect::new(0, 17, 60, 3), &mut buf);

        // palette box is 4 entries + borders, directly above the input
        assert_eq!(composer.suggestion_at(5, 12), Some(0));
        assert_eq!(composer.suggestion_at(5, 15), Some(3));
        assert_eq!(composer.suggestion_at(5, 16), None);
        assert_eq!(composer.suggestion_at(5, 2), None);
    }
}
