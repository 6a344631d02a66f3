//! Deferred reply delivery.
//!
//! The conversation store never waits on a reply; it hands a [`ReplyTicket`] to a
//! [`ReplyScheduler`] and is told later, through the event loop, that the ticket
//! is due. Tests drive [`ManualScheduler`] by advancing a virtual clock, while the
//! terminal app uses [`TokioScheduler`], which posts [`AppEvent::ReplyDue`] after a
//! real delay.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::events::AppEvent;

/// Identifies one in-flight reply. Keyed by the id of the user message that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplyTicket(u64);

impl ReplyTicket {
    pub fn new(message_id: u64) -> Self {
        Self(message_id)
    }

    pub fn message_id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReplyTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reply#{}", self.0)
    }
}

/// Capability to fire a ticket once after a delay.
pub trait ReplyScheduler {
    fn schedule(&mut self, ticket: ReplyTicket, delay: Duration);

    /// Drop a scheduled ticket. Cancelling an unknown or already fired ticket is a no-op.
    fn cancel(&mut self, ticket: ReplyTicket);
}

/// Virtual-clock scheduler. Nothing fires until [`ManualScheduler::advance`] is called.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    queue: Vec<(Duration, ReplyTicket)>,
}

#[cfg(test)]
impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Move the clock forward and return every ticket that became due, in due order.
    pub fn advance(&mut self, by: Duration) -> Vec<ReplyTicket> {
        self.now += by;
        let now = self.now;

        let mut due: Vec<(Duration, ReplyTicket)> = Vec::new();
        self.queue.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });

        due.sort_by_key(|(at, ticket)| (*at, *ticket));
        due.into_iter().map(|(_, ticket)| ticket).collect()
    }
}

#[cfg(test)]
impl ReplyScheduler for ManualScheduler {
    fn schedule(&mut self, ticket: ReplyTicket, delay: Duration) {
        self.queue.push((self.now + delay, ticket));
    }

    fn cancel(&mut self, ticket: ReplyTicket) {
        self.queue.retain(|(_, queued)| *queued != ticket);
    }
}

/// Timer scheduler backed by the tokio runtime. Must be used from within a runtime.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<AppEvent>,
    timers: HashMap<ReplyTicket, AbortHandle>,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            tx,
            timers: HashMap::new(),
        }
    }
}

impl ReplyScheduler for TokioScheduler {
    fn schedule(&mut self, ticket: ReplyTicket, delay: Duration) {
        self.timers.retain(|_, handle| !handle.is_finished());

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppEvent::ReplyDue(ticket));
        });
        self.timers.insert(ticket, handle.abort_handle());
    }

    fn cancel(&mut self, ticket: ReplyTicket) {
        if let Some(handle) = self.timers.remove(&ticket) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
