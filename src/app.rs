//! Terminal event loop.
//!
//! Input is read on a blocking thread and forwarded into the same channel the
//! [`TokioScheduler`] posts due replies to, so the loop only ever waits on one
//! receiver.

use std::time::Duration;

use anyhow::Result;
use crossterm::event;
use ratatui::{Terminal, backend::Backend};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::events::{AppEvent, TuiEvent};
use crate::reply::CannedReply;
use crate::scheduler::{ReplyScheduler, TokioScheduler};
use crate::ui::conversation::{ConversationAction, ConversationManager};

/// How long the input thread blocks before checking whether the loop is gone
const INPUT_POLL: Duration = Duration::from_millis(100);

pub async fn run<B: Backend>(terminal: &mut Terminal<B>, config: &Config) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    spawn_input_reader(tx.clone());

    let source = CannedReply::new(config.reply.text.clone());
    let mut manager = ConversationManager::new(config, TokioScheduler::new(tx), Box::new(source));

    info!(delay_ms = config.reply.delay_ms, "conversation started");
    run_with_events(terminal, &mut manager, rx).await
}

fn spawn_input_reader(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL) {
                Ok(false) => {}
                Ok(true) => match event::read() {
                    Ok(evt) => {
                        let Some(evt) = TuiEvent::from_crossterm(evt) else {
                            continue;
                        };
                        if tx.send(AppEvent::Tui(evt)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to read terminal input");
                        let _ = tx.send(AppEvent::ExitRequest);
                        break;
                    }
                },
                Err(e) => {
                    error!(error = %e, "failed to poll terminal input");
                    let _ = tx.send(AppEvent::ExitRequest);
                    break;
                }
            }
        }
    });
}

/// Draw, wait for the next event, apply it. Returns when asked to exit or the channel closes.
pub async fn run_with_events<B: Backend, S: ReplyScheduler>(
    terminal: &mut Terminal<B>,
    manager: &mut ConversationManager<S>,
    mut events: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| manager.render(frame.size(), frame.buffer_mut()))?;

        let Some(event) = events.recv().await else {
            break;
        };
        if !handle_event(manager, event) {
            break;
        }
    }

    manager.teardown();
    info!("conversation closed");
    Ok(())
}

/// Apply one event. `false` stops the loop.
fn handle_event<S: ReplyScheduler>(manager: &mut ConversationManager<S>, event: AppEvent) -> bool {
    match event {
        AppEvent::Tui(TuiEvent::Key(key)) => {
            if manager.on_key_down(key) == ConversationAction::Exit {
                return false;
            }
        }
        AppEvent::Tui(TuiEvent::Mouse(mouse)) => manager.on_mouse(mouse),
        AppEvent::Tui(TuiEvent::Paste(text)) => manager.on_paste(&text),
        AppEvent::Tui(TuiEvent::Resize(width, height)) => {
            // next draw picks up the new size
            debug!(width, height, "terminal resized");
        }
        AppEvent::ReplyDue(ticket) => {
            manager.on_reply_due(ticket);
        }
        AppEvent::ExitRequest => return false,
    }
    true
}
