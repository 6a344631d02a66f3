//! Conversation history display component

use crate::events::{ScrollMetrics, Sender};
use crate::ui::conversation::commands::CommandSuggestion;
use crate::ui::conversation::scroll::Viewport;
use crate::ui::conversation::store::Message;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget,
    },
};
use std::cell::Cell;

/// Row-based viewport over the rendered conversation
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    scroll_top: u32,
    content_height: u32,
    client_height: u32,
    quick_action_area: Cell<Option<Rect>>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn max_scroll_top(&self) -> u32 {
        self.content_height.saturating_sub(self.client_height)
    }

    /// Record the size of the latest layout. A viewport resting on the bottom stays there.
    pub fn set_geometry(&mut self, content_height: u32, client_height: u32) {
        let was_at_bottom = self.scroll_top >= self.max_scroll_top();
        self.content_height = content_height;
        self.client_height = client_height;

        if was_at_bottom {
            self.scroll_top = self.max_scroll_top();
        } else {
            self.scroll_top = self.scroll_top.min(self.max_scroll_top());
        }
    }

    /// Move by `delta` rows, clamped to the content
    pub fn scroll_by(&mut self, delta: i32) {
        let target = i64::from(self.scroll_top) + i64::from(delta);
        let clamped = target.clamp(0, i64::from(self.max_scroll_top()));
        self.scroll_top = u32::try_from(clamped).unwrap_or(0);
    }

    pub fn page_height(&self) -> i32 {
        i32::try_from(self.client_height.max(1)).unwrap_or(i32::MAX)
    }

    #[cfg(test)]
    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    /// Which quick action of the welcome panel is drawn at this cell
    pub fn quick_action_at(&self, column: u16, row: u16, count: usize) -> Option<usize> {
        let area = self.quick_action_area.get()?;
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        if !inside {
            return None;
        }
        let index = usize::from(row - area.y);
        (index < count).then_some(index)
    }

    /// Lay out every message for the given width
    pub fn build_lines(messages: &[Message], pending: bool, width: u16) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        for message in messages {
            lines.extend(render_message(message, width));
            // spacing between messages
            lines.push(Line::from(""));
        }

        if pending {
            lines.push(Line::from(vec![
                Span::styled("🤖 AI ", Style::default().fg(Color::DarkGray)),
                Span::styled("is typing…", Style::default().fg(Color::Yellow)),
            ]));
        }

        lines
    }

    /// Draw already laid-out lines starting at the current scroll position
    pub fn render_lines(&self, lines: &[Line<'static>], area: Rect, buf: &mut Buffer) {
        self.quick_action_area.set(None);

        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        let start = self.scroll_top as usize;
        for (i, line) in lines
            .iter()
            .skip(start)
            .take(inner_area.height as usize)
            .enumerate()
        {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }

        if self.content_height > self.client_height {
            let mut state = ScrollbarState::new(self.max_scroll_top() as usize)
                .position(self.scroll_top as usize);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(area, buf, &mut state);
        }
    }

    /// Welcome panel shown until the first message is sent
    pub fn render_welcome(&self, suggestions: &[CommandSuggestion], area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("✨ Parley");
        let inner_area = block.inner(area);
        block.render(area, buf);

        let intro = [
            Line::from(Span::styled(
                "How can I help you today?",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "I'm your AI assistant, ready to help with any questions or tasks you have.",
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
        ];

        let mut y = inner_area.y;
        let bottom = inner_area.y + inner_area.height;
        for line in &intro {
            if y >= bottom {
                break;
            }
            buf.set_line(inner_area.x, y, line, inner_area.width);
            y += 1;
        }

        let first_action_row = y;
        for suggestion in suggestions {
            if y >= bottom {
                break;
            }
            let line = Line::from(vec![
                Span::styled(
                    format!("{:<10}", suggestion.prefix),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    suggestion.label.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(" — ", Style::default().fg(Color::DarkGray)),
                Span::styled(suggestion.description.clone(), Style::default().fg(Color::Gray)),
            ]);
            buf.set_line(inner_area.x, y, &line, inner_area.width);
            y += 1;
        }

        self.quick_action_area.set(Some(Rect {
            x: inner_area.x,
            y: first_action_row,
            width: inner_area.width,
            height: y - first_action_row,
        }));

        if y + 1 < bottom {
            let hint = Line::from(Span::styled(
                "Press Enter to send, Shift+Enter for a new line, / for commands.",
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner_area.x, y + 1, &hint, inner_area.width);
        }
    }
}

impl Viewport for ConversationHistory {
    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics::new(self.content_height, self.scroll_top, self.client_height)
    }

    /// Terminals cannot animate, so a smooth scroll lands immediately.
    fn scroll_to_bottom(&mut self, _smooth: bool) {
        self.scroll_top = self.max_scroll_top();
    }
}

/// Render a single message into lines
fn render_message(message: &Message, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let role_icon = match message.sender {
        Sender::User => "👤",
        Sender::Assistant => "🤖",
    };

    let timestamp = message.timestamp.format("%H:%M:%S").to_string();
    let header = format!(
        "{} {} {} {}",
        role_icon,
        message.sender.display_name(),
        timestamp,
        "─".repeat(20)
    );

    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    for content_line in wrap_text(&message.content, width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, content_style(message)),
        ]));
    }

    lines
}

/// Get content style based on sender
fn content_style(message: &Message) -> Style {
    if message.is_error {
        return Style::default().fg(Color::Red);
    }
    match message.sender {
        Sender::User => Style::default().fg(Color::Blue),
        Sender::Assistant => Style::default().fg(Color::Green),
    }
}

/// Wrap text to the given display width, keeping explicit line breaks.
/// Words wider than a line are split across lines.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    textwrap::wrap(text, width)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}
