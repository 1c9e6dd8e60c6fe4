//! Strictly serial FIFO of narrated actions.

use super::action::{ActionTag, NarratedAction};
use std::collections::VecDeque;

/// Identifies one dequeued action. Completions carrying any other ticket
/// are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    /// Session generation; bumped on every start and stop
    pub epoch: u64,
    /// Per-action sequence number
    pub seq: u64,
}

#[derive(Debug)]
struct InFlight {
    ticket: Ticket,
    action: NarratedAction,
}

/// Pending actions plus the single action in flight.
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: VecDeque<NarratedAction>,
    in_flight: Option<InFlight>,
    last_completed: Option<ActionTag>,
    paused: bool,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    pub fn enqueue(&mut self, action: NarratedAction) {
        tracing::debug!("Enqueued {}", action.tag);
        self.pending.push_back(action);
    }

    /// Take the head and mark it in flight under `ticket`.
    ///
    /// No-op while paused, while another action is in flight, or when empty.
    pub fn dequeue(&mut self, ticket: Ticket) -> Option<&NarratedAction> {
        if self.paused || self.in_flight.is_some() {
            return None;
        }

        let action = self.pending.pop_front()?;
        let in_flight = self.in_flight.insert(InFlight { ticket, action });
        Some(&in_flight.action)
    }

    /// Check a ticket against the action in flight.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.in_flight
            .as_ref()
            .map(|f| f.ticket == ticket)
            .unwrap_or(false)
    }

    /// Finish the action in flight if `ticket` matches it.
    pub fn complete(&mut self, ticket: Ticket) -> Option<NarratedAction> {
        if !self.is_current(ticket) {
            return None;
        }

        let finished = self.in_flight.take()?;
        self.last_completed = Some(finished.action.tag);
        Some(finished.action)
    }

    /// Drop the action in flight without recording a completion.
    pub fn interrupt(&mut self) -> Option<NarratedAction> {
        self.in_flight.take().map(|f| f.action)
    }

    /// Drop every pending action.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Forget everything, including the last completed tag.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.in_flight = None;
        self.last_completed = None;
        self.paused = false;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&NarratedAction> {
        self.in_flight.as_ref().map(|f| &f.action)
    }

    pub fn last_completed(&self) -> Option<ActionTag> {
        self.last_completed
    }

    /// Tags still waiting, head first.
    pub fn pending_tags(&self) -> Vec<ActionTag> {
        self.pending.iter().map(|a| a.tag).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
