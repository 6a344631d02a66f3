use crate::config::Config;
use crate::error::ReplyError;
use crate::events::ScrollMetrics;
use crate::reply::ReplySource;
use crate::scheduler::{ReplyScheduler, ReplyTicket};
use crate::ui::conversation::commands::{CommandSuggestion, parse_slash_command};
use crate::ui::conversation::composer::{ComposerResult, ConversationComposer};
use crate::ui::conversation::history::ConversationHistory;
use crate::ui::conversation::palette::PaletteState;
use crate::ui::conversation::scroll::{ScrollCommand, ScrollFollower, Viewport};
use crate::ui::conversation::store::{ConversationStore, Message, SubmitOutcome};
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use tracing::debug;

/// Rows moved per mouse wheel notch
const WHEEL_STEP: i32 = 3;
const MAX_COMPOSER_LINES: u16 = 6;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Submitted(ReplyTicket),
    Exit,
}

/// Wires the composer, palette, store and scroll follower together for one conversation
pub struct ConversationManager<S> {
    store: ConversationStore<S>,
    composer: ConversationComposer,
    history: ConversationHistory,
    follower: ScrollFollower,
    reply_source: Box<dyn ReplySource>,
    notice: Option<&'static str>,
    show_welcome: bool,
}

impl<S: ReplyScheduler> ConversationManager<S> {
    pub fn new(config: &Config, scheduler: S, reply_source: Box<dyn ReplySource>) -> Self {
        let mut store = ConversationStore::new(scheduler, config.reply_delay());
        if let Some(greeting) = &config.chat.greeting {
            store = store.with_greeting(greeting.clone());
        }

        Self {
            store,
            composer: ConversationComposer::new(
                config.chat.placeholder.clone(),
                config.commands.clone(),
            ),
            history: ConversationHistory::new(),
            follower: ScrollFollower::new(config.scroll.tolerance, config.scroll.smooth),
            reply_source,
            notice: None,
            show_welcome: true,
        }
    }

    /// Replace the whole input buffer (paste or programmatic set)
    pub fn on_text_change(&mut self, text: &str) {
        self.notice = None;
        self.composer.set_content(text.to_string());
    }

    /// Insert pasted text at the cursor
    pub fn on_paste(&mut self, text: &str) {
        self.notice = None;
        self.composer.insert_str(text);
    }

    /// Handle key input
    pub fn on_key_down(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => return ConversationAction::Exit,
                KeyCode::Char('k') => {
                    self.composer.toggle_palette();
                    return ConversationAction::None;
                }
                KeyCode::End => {
                    self.follower.jump_to_bottom(&mut self.history);
                    return ConversationAction::None;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::PageUp => {
                self.scroll_history(-self.history.page_height());
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_history(self.history.page_height());
                return ConversationAction::None;
            }
            _ => {}
        }

        let before = self.composer.content().len();
        match self.composer.handle_key(key) {
            ComposerResult::Submit => match self.on_submit() {
                SubmitOutcome::Accepted(ticket) => ConversationAction::Submitted(ticket),
                SubmitOutcome::Rejected(_) => ConversationAction::None,
            },
            ComposerResult::None => {
                if self.composer.content().len() != before {
                    self.notice = None;
                }
                ConversationAction::None
            }
        }
    }

    /// Pointer commit of a palette entry or a welcome quick action
    pub fn on_suggestion_click(&mut self, index: usize) -> bool {
        self.notice = None;
        if self.composer.palette().is_visible() {
            return self.composer.select_suggestion(index);
        }

        // the welcome panel offers the same commands while the palette is closed
        if !self.show_welcome {
            return false;
        }
        let Some(text) = self
            .suggestions()
            .get(index)
            .map(CommandSuggestion::committed_text)
        else {
            return false;
        };
        self.composer.set_content(text);
        true
    }

    /// Send the current buffer. Rejections leave the buffer and log untouched.
    pub fn on_submit(&mut self) -> SubmitOutcome {
        let text = self.composer.content().to_string();
        let outcome = self.store.submit(&text);

        match outcome {
            SubmitOutcome::Accepted(ticket) => {
                if let Some(command) = parse_slash_command(&text, self.composer.palette().suggestions()) {
                    debug!(%ticket, prefix = %command.suggestion.prefix, "command message submitted");
                }
                self.composer.clear();
                self.composer.set_busy(true);
                self.notice = None;
                self.show_welcome = false;
            }
            SubmitOutcome::Rejected(rejection) => {
                self.notice = Some(rejection.notice());
            }
        }

        outcome
    }

    /// A scheduled reply fired. Stale tickets are dropped by the store.
    pub fn on_reply_due(&mut self, ticket: ReplyTicket) -> bool {
        let outcome = match self.store.pending_ticket() {
            Some(pending) if pending == ticket => {
                let prompt = self
                    .store
                    .message(ticket.message_id())
                    .map(|message| message.content.clone())
                    .unwrap_or_default();
                self.reply_source.reply(&prompt)
            }
            _ => Err(ReplyError::Cancelled),
        };

        let delivered = self.store.deliver(ticket, outcome);
        self.composer.set_busy(self.store.pending_reply());
        delivered
    }

    /// Viewport scrolled to `metrics`
    pub fn on_viewport_scroll(&mut self, metrics: ScrollMetrics) {
        self.follower.on_scroll(metrics);
    }

    /// The reader is scrolling up through history
    pub fn disable_auto_scroll(&mut self, metrics: ScrollMetrics) {
        self.follower.disable_auto_scroll(metrics);
    }

    /// Let the follower pull an external viewport to the bottom after the message count changed
    pub fn sync_viewport<V: Viewport>(&mut self, viewport: &mut V) -> Option<ScrollCommand> {
        let message_count = self.store.message_count();
        self.follower.on_content_change(message_count, viewport)
    }

    /// Mouse wheel scrolls history; left click picks palette entries and quick actions
    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_history(-WHEEL_STEP),
            MouseEventKind::ScrollDown => self.scroll_history(WHEEL_STEP),
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = self.composer.suggestion_at(mouse.column, mouse.row).or_else(|| {
                    if self.show_welcome {
                        self.history
                            .quick_action_at(mouse.column, mouse.row, self.suggestions().len())
                    } else {
                        None
                    }
                });
                if let Some(index) = hit {
                    self.on_suggestion_click(index);
                }
            }
            _ => {}
        }
    }

    fn scroll_history(&mut self, delta: i32) {
        self.history.scroll_by(delta);
        let metrics = self.history.metrics();
        if delta < 0 {
            self.follower.disable_auto_scroll(metrics);
        }
        self.follower.on_scroll(metrics);
    }

    /// Cancel any in-flight reply
    pub fn teardown(&mut self) {
        self.store.teardown();
        self.composer.set_busy(false);
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn pending_reply(&self) -> bool {
        self.store.pending_reply()
    }

    #[cfg(test)]
    pub fn store(&self) -> &ConversationStore<S> {
        &self.store
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut ConversationStore<S> {
        &mut self.store
    }

    pub fn palette(&self) -> PaletteState {
        self.composer.palette_state()
    }

    pub fn suggestions(&self) -> &[CommandSuggestion] {
        self.composer.palette().suggestions()
    }

    pub fn input(&self) -> &str {
        self.composer.content()
    }

    pub fn notice(&self) -> Option<&'static str> {
        self.notice
    }

    pub fn show_welcome(&self) -> bool {
        self.show_welcome
    }

    pub fn auto_follow(&self) -> bool {
        self.follower.auto_follow()
    }

    /// Enabled state of the send control
    pub fn can_submit(&self) -> bool {
        !self.composer.content().trim().is_empty() && !self.store.pending_reply()
    }

    /// Render the conversation UI components
    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let input_lines = self.composer.content().split('\n').count() as u16;
        let composer_height = input_lines.clamp(1, MAX_COMPOSER_LINES) + 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(composer_height),
                Constraint::Length(1),
            ])
            .split(area);

        if self.show_welcome {
            let suggestions = self.composer.palette().suggestions();
            self.history.render_welcome(suggestions, chunks[0], buf);
        } else {
            let inner = Block::default().borders(Borders::ALL).inner(chunks[0]);
            let lines = ConversationHistory::build_lines(
                self.store.messages(),
                self.store.pending_reply(),
                inner.width,
            );
            self.history
                .set_geometry(lines.len() as u32, u32::from(inner.height));
            let message_count = self.store.message_count();
            self.follower.on_content_change(message_count, &mut self.history);
            self.history.render_lines(&lines, chunks[0], buf);
        }

        (&self.composer).render(chunks[1], buf);
        self.render_status(chunks[2], buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let mut spans = Vec::new();

        if self.store.pending_reply() {
            spans.push(Span::styled("🤖 thinking… ", Style::default().fg(Color::Yellow)));
        }

        let send_style = if self.can_submit() {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled("[Enter ⏎ send] ", send_style));

        match self.notice {
            Some(notice) => spans.push(Span::styled(notice, Style::default().fg(Color::Red))),
            None => {
                if !self.follower.auto_follow() {
                    spans.push(Span::styled(
                        "Ctrl+End to jump to latest  ",
                        Style::default().fg(Color::Cyan),
                    ));
                }
                spans.push(Span::styled(
                    "/ commands · Ctrl+K palette · PgUp/PgDn scroll · Ctrl+C quit",
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Sender;
    use crate::reply::{CannedReply, MockReplySource};
    use crate::scheduler::ManualScheduler;
    use crate::ui::conversation::store::Rejection;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn config() -> Config {
        let mut config = Config::default();
        config.chat.greeting = None;
        config
    }

    fn manager_with(config: &Config, source: Box<dyn ReplySource>) -> ConversationManager<ManualScheduler> {
        ConversationManager::new(config, ManualScheduler::new(), source)
    }

    fn manager() -> ConversationManager<ManualScheduler> {
        let config = config();
        manager_with(&config, Box::new(CannedReply::new(config.reply.text.clone())))
    }

    fn press(manager: &mut ConversationManager<ManualScheduler>, code: KeyCode) -> ConversationAction {
        manager.on_key_down(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(manager: &mut ConversationManager<ManualScheduler>, text: &str) {
        for c in text.chars() {
            press(manager, KeyCode::Char(c));
        }
    }

    /// Advance virtual time and hand every fired ticket back to the manager
    fn advance(manager: &mut ConversationManager<ManualScheduler>, by: Duration) {
        let fired = manager.store_mut().scheduler_mut().advance(by);
        for ticket in fired {
            manager.on_reply_due(ticket);
        }
    }

    #[test]
    fn greeting_is_seeded_from_config() {
        let config = Config::default();
        let manager = manager_with(&config, Box::new(CannedReply::new("x")));

        assert_eq!(manager.messages().len(), 1);
        assert_eq!(manager.messages()[0].content, "Hello! How can I help you today?");
        assert!(!manager.pending_reply());
        assert!(manager.show_welcome());
    }

    #[test]
    fn enter_submits_and_clears_input() {
        let mut manager = manager();
        type_text(&mut manager, "hi");
        assert!(manager.can_submit());

        let action = press(&mut manager, KeyCode::Enter);
        assert_eq!(action, ConversationAction::Submitted(ReplyTicket::new(1)));
        assert_eq!(manager.input(), "");
        assert!(manager.pending_reply());
        assert!(!manager.can_submit());
        assert!(!manager.show_welcome());
    }

    #[test]
    fn canned_reply_arrives_after_delay() {
        let mut manager = manager();
        type_text(&mut manager, "hi");
        press(&mut manager, KeyCode::Enter);

        advance(&mut manager, Duration::from_millis(1999));
        assert!(manager.pending_reply());

        advance(&mut manager, Duration::from_millis(1));
        assert!(!manager.pending_reply());

        let log: Vec<(Sender, &str)> = manager
            .messages()
            .iter()
            .map(|m| (m.sender, m.content.as_str()))
            .collect();
        assert_eq!(
            log,
            [
                (Sender::User, "hi"),
                (
                    Sender::Assistant,
                    "Thanks for your message! This is a demo AI response."
                )
            ]
        );
    }

    #[test]
    fn whitespace_submit_sets_notice() {
        let mut manager = manager();
        manager.on_text_change("  ");

        assert_eq!(manager.on_submit(), SubmitOutcome::Rejected(Rejection::Empty));
        assert!(manager.messages().is_empty());
        assert!(!manager.pending_reply());
        assert_eq!(manager.notice(), Some("Message is empty"));
        assert_eq!(manager.input(), "  ");

        type_text(&mut manager, "x");
        assert_eq!(manager.notice(), None);
    }

    #[test]
    fn submit_while_pending_keeps_buffer() {
        let mut manager = manager();
        manager.on_text_change("first");
        manager.on_submit();

        manager.on_text_change("second");
        assert_eq!(
            manager.on_submit(),
            SubmitOutcome::Rejected(Rejection::ReplyPending)
        );
        assert_eq!(manager.input(), "second");
        assert_eq!(manager.messages().len(), 1);
        assert_eq!(manager.notice(), Some("Waiting for the previous reply"));
    }

    #[test]
    fn palette_scenario_from_typing_to_tab() {
        let mut manager = manager();
        manager.on_text_change("/f");

        assert_eq!(
            manager.palette(),
            PaletteState {
                visible: true,
                highlighted: Some(1)
            }
        );

        press(&mut manager, KeyCode::Tab);
        assert_eq!(manager.input(), "/figma ");
        assert!(!manager.palette().visible);
        assert!(manager.messages().is_empty());
    }

    #[test]
    fn enter_with_unmatched_command_submits_text() {
        let mut manager = manager();
        type_text(&mut manager, "/zzz");
        assert!(manager.palette().visible);

        let action = press(&mut manager, KeyCode::Enter);
        assert!(matches!(action, ConversationAction::Submitted(_)));
        assert_eq!(manager.messages()[0].content, "/zzz");
    }

    #[test]
    fn suggestion_click_commits_prefix() {
        let mut manager = manager();
        manager.on_text_change("/");

        assert!(manager.on_suggestion_click(3));
        assert_eq!(manager.input(), "/improve ");
        assert!(!manager.palette().visible);

        assert!(!manager.on_suggestion_click(42));
        assert_eq!(manager.input(), "/improve ");
    }

    #[test]
    fn welcome_quick_action_fills_input() {
        let mut manager = manager();
        manager.on_text_change("draft");

        assert!(manager.on_suggestion_click(2));
        assert_eq!(manager.input(), "/page ");
    }

    struct FixedViewport {
        metrics: ScrollMetrics,
        scrolled: usize,
    }

    impl Viewport for FixedViewport {
        fn metrics(&self) -> ScrollMetrics {
            self.metrics
        }

        fn scroll_to_bottom(&mut self, _smooth: bool) {
            self.scrolled += 1;
            self.metrics.scroll_top = self.metrics.scroll_height - self.metrics.client_height;
        }
    }

    #[test]
    fn external_viewport_follows_only_when_enabled() {
        let mut manager = manager();
        let mut viewport = FixedViewport {
            metrics: ScrollMetrics::new(1000, 0, 20),
            scrolled: 0,
        };

        manager.disable_auto_scroll(viewport.metrics());
        assert!(!manager.auto_follow());

        manager.on_text_change("hi");
        manager.on_submit();
        assert_eq!(manager.sync_viewport(&mut viewport), None);
        assert_eq!(viewport.scrolled, 0);

        manager.on_viewport_scroll(ScrollMetrics::new(1000, 980, 20));
        assert!(manager.auto_follow());

        advance(&mut manager, Duration::from_secs(2));
        assert!(manager.sync_viewport(&mut viewport).is_some());
        assert_eq!(viewport.scrolled, 1);
    }

    #[test]
    fn reply_arrival_scrolls_following_viewport() {
        let mut manager = manager();
        let mut viewport = FixedViewport {
            metrics: ScrollMetrics::new(1000, 980, 20),
            scrolled: 0,
        };

        manager.on_text_change("hi");
        manager.on_submit();
        assert!(manager.sync_viewport(&mut viewport).is_some());
        assert_eq!(viewport.scrolled, 1);

        // the reader sits one row above the bottom, still within tolerance
        viewport.metrics = ScrollMetrics::new(1010, 989, 20);
        manager.on_viewport_scroll(viewport.metrics());
        assert!(manager.auto_follow());

        advance(&mut manager, Duration::from_secs(2));
        assert_eq!(manager.messages().len(), 2);
        assert!(manager.sync_viewport(&mut viewport).is_some());
        assert_eq!(viewport.scrolled, 2);
        assert_eq!(viewport.metrics.distance_to_bottom(), 0);
    }

    #[test]
    fn failing_source_surfaces_error_message() {
        let mut source = MockReplySource::new();
        source
            .expect_reply()
            .withf(|prompt| prompt == "hi")
            .times(1)
            .returning(|_| Err(ReplyError::failed("backend unavailable")));

        let mut manager = manager_with(&config(), Box::new(source));
        manager.on_text_change("hi");
        manager.on_submit();
        advance(&mut manager, Duration::from_secs(3));

        assert!(!manager.pending_reply());
        let last = manager.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.content, "Reply failed: backend unavailable");

        // the failed turn does not block the next one
        manager.on_text_change("again");
        assert!(manager.on_submit().is_accepted());
    }

    #[test]
    fn blank_canned_reply_ends_turn_with_error() {
        let mut config = config();
        config.reply.text = String::new();
        let mut manager = manager_with(&config, Box::new(CannedReply::new(config.reply.text.clone())));

        manager.on_text_change("hi");
        manager.on_submit();
        advance(&mut manager, Duration::from_secs(2));

        assert!(!manager.pending_reply());
        let last = manager.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.content, "Reply failed: no reply text configured");
    }

    #[test]
    fn stale_ticket_never_reaches_source() {
        let mut source = MockReplySource::new();
        source.expect_reply().times(0);

        let mut manager = manager_with(&config(), Box::new(source));
        assert!(!manager.on_reply_due(ReplyTicket::new(5)));
        assert!(manager.messages().is_empty());
    }

    #[test]
    fn teardown_cancels_in_flight_reply() {
        let mut manager = manager();
        manager.on_text_change("hi");
        manager.on_submit();
        manager.teardown();

        advance(&mut manager, Duration::from_secs(5));
        assert_eq!(manager.messages().len(), 1);
        assert!(!manager.pending_reply());
    }

    #[test]
    fn ctrl_c_exits() {
        let mut manager = manager();
        let action = manager.on_key_down(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action, ConversationAction::Exit);
    }

    #[test]
    fn scrolling_up_pauses_follow_until_back_at_bottom() {
        let mut manager = manager();
        for turn in 0..15 {
            manager.on_text_change(&format!("message number {turn}"));
            manager.on_submit();
            advance(&mut manager, Duration::from_secs(2));
        }

        let backend = TestBackend::new(60, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| manager.render(frame.size(), frame.buffer_mut()))
            .unwrap();
        assert!(manager.auto_follow());

        press(&mut manager, KeyCode::PageUp);
        assert!(!manager.auto_follow());

        // new content does not move the reader
        let top = manager.history.scroll_top();
        manager.on_text_change("one more");
        manager.on_submit();
        terminal
            .draw(|frame| manager.render(frame.size(), frame.buffer_mut()))
            .unwrap();
        assert_eq!(manager.history.scroll_top(), top);

        for _ in 0..20 {
            press(&mut manager, KeyCode::PageDown);
        }
        assert!(manager.auto_follow());
    }

    #[test]
    fn render_shows_palette_and_messages() {
        let mut manager = manager();
        manager.on_text_change("hello there");
        manager.on_submit();
        advance(&mut manager, Duration::from_secs(2));
        manager.on_text_change("/");

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| manager.render(frame.size(), frame.buffer_mut()))
            .unwrap();

        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("hello there"));
        assert!(rendered.contains("/figma"));
        assert!(rendered.contains("Import Figma"));
    }
}
