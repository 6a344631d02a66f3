//! Conversation log and single-turn reply gating.
//!
//! At most one reply is in flight. While a reply is pending new submissions are
//! dropped, not queued.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ReplyError;
use crate::events::Sender;
use crate::scheduler::{ReplyScheduler, ReplyTicket};

/// A single message in the conversation. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub content: String,
    /// Assistant message standing in for a reply that failed
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

/// Why a submission was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    ReplyPending,
}

impl Rejection {
    pub fn notice(&self) -> &'static str {
        match self {
            Rejection::Empty => "Message is empty",
            Rejection::ReplyPending => "Waiting for the previous reply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(ReplyTicket),
    Rejected(Rejection),
}

impl SubmitOutcome {
    #[cfg(test)]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

pub struct ConversationStore<S> {
    id: Uuid,
    messages: Vec<Message>,
    next_id: u64,
    pending: Option<ReplyTicket>,
    scheduler: S,
    reply_delay: Duration,
}

impl<S: ReplyScheduler> ConversationStore<S> {
    pub fn new(scheduler: S, reply_delay: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            next_id: 1,
            pending: None,
            scheduler,
            reply_delay,
        }
    }

    /// Seed the log with an assistant greeting. Does not start a turn.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.append(Sender::Assistant, greeting.into(), false);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: u64) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn pending_reply(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_ticket(&self) -> Option<ReplyTicket> {
        self.pending
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    #[cfg(test)]
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Append a user message and schedule exactly one reply.
    ///
    /// Whitespace-only text, or any text while a reply is pending, is rejected and
    /// leaves the store untouched. The text is stored as given, untrimmed.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Rejected(Rejection::Empty);
        }
        if let Some(ticket) = self.pending {
            warn!(conversation = %self.id, %ticket, "submission dropped while reply pending");
            return SubmitOutcome::Rejected(Rejection::ReplyPending);
        }

        let id = self.append(Sender::User, text.to_string(), false);
        let ticket = ReplyTicket::new(id);
        self.pending = Some(ticket);
        self.scheduler.schedule(ticket, self.reply_delay);
        info!(conversation = %self.id, %ticket, "message submitted");

        SubmitOutcome::Accepted(ticket)
    }

    /// Append the assistant reply and end the turn. No-op when nothing is pending.
    pub fn receive_reply(&mut self, text: impl Into<String>) -> bool {
        let Some(ticket) = self.pending.take() else {
            return false;
        };

        self.append(Sender::Assistant, text.into(), false);
        info!(conversation = %self.id, %ticket, "reply received");
        true
    }

    /// End the turn with an error message in place of the reply. No-op when nothing is pending.
    pub fn fail_reply(&mut self, error: &ReplyError) -> bool {
        let Some(ticket) = self.pending.take() else {
            return false;
        };

        self.append(Sender::Assistant, format!("Reply failed: {error}"), true);
        warn!(conversation = %self.id, %ticket, %error, "reply failed");
        true
    }

    /// Resolve a fired ticket. Tickets other than the pending one are stale and ignored.
    pub fn deliver(&mut self, ticket: ReplyTicket, outcome: Result<String, ReplyError>) -> bool {
        if self.pending != Some(ticket) {
            warn!(conversation = %self.id, %ticket, "ignoring stale reply");
            return false;
        }

        match outcome {
            Ok(text) => self.receive_reply(text),
            Err(error) => self.fail_reply(&error),
        }
    }

    /// Cancel the in-flight reply, if any. Used when the conversation is torn down.
    pub fn teardown(&mut self) {
        if let Some(ticket) = self.pending.take() {
            self.scheduler.cancel(ticket);
            info!(conversation = %self.id, %ticket, "pending reply cancelled");
        }
    }

    fn append(&mut self, sender: Sender, content: String, is_error: bool) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message {
            id,
            sender,
            content,
            is_error,
            timestamp: Utc::now(),
        });
        id
    }
}
