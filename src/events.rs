use serde::{Deserialize, Serialize};

use crate::scheduler::ReplyTicket;

/// Internal application events for coordinating between components
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Terminal input
    Tui(TuiEvent),

    /// A scheduled reply is due for the given turn
    ReplyDue(ReplyTicket),

    /// Request to exit the application
    ExitRequest,
}

/// TUI-specific events (keyboard, mouse, etc.)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Mouse event
    Mouse(crossterm::event::MouseEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),
}

impl TuiEvent {
    pub fn from_crossterm(event: crossterm::event::Event) -> Option<Self> {
        use crossterm::event::Event;

        match event {
            Event::Key(key) => Some(TuiEvent::Key(key)),
            Event::Mouse(mouse) => Some(TuiEvent::Mouse(mouse)),
            Event::Paste(text) => Some(TuiEvent::Paste(text)),
            Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
            Event::FocusGained | Event::FocusLost => None,
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "AI",
        }
    }
}

/// Geometry of a scrollable viewport, in viewport-relative units (rows for the terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub scroll_height: u32,
    pub scroll_top: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    pub fn new(scroll_height: u32, scroll_top: u32, client_height: u32) -> Self {
        Self {
            scroll_height,
            scroll_top,
            client_height,
        }
    }

    /// `|scroll_height - scroll_top - client_height|`
    pub fn distance_to_bottom(&self) -> u32 {
        let distance =
            i64::from(self.scroll_height) - i64::from(self.scroll_top) - i64::from(self.client_height);
        u32::try_from(distance.unsigned_abs()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_bottom_is_absolute() {
        assert_eq!(ScrollMetrics::new(1000, 980, 20).distance_to_bottom(), 0);
        assert_eq!(ScrollMetrics::new(1000, 0, 20).distance_to_bottom(), 980);
        // overscroll past the end still counts as a distance
        assert_eq!(ScrollMetrics::new(100, 95, 20).distance_to_bottom(), 15);
    }

    #[test]
    fn sender_serializes_lowercase() {
        let json = serde_json::to_string(&Sender::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
