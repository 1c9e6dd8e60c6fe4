//! Sequencer: drives the action queue through the segment player.
//!
//! The only component allowed to call [`SegmentPlayer::play`]. Resolution
//! and playback run off the runtime task and report back through the
//! runtime's input channel, tagged with the ticket they were issued for.

use super::action::{ActionTag, NarratedAction};
use super::queue::{ActionQueue, Ticket};
use super::runtime::Input;
use crate::audio::{AudioClip, AudioError, PlaybackOutcome, ResourceResolver, SegmentPlayer};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// An action whose completion was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub action: NarratedAction,
    pub outcome: PlaybackOutcome,
}

pub(crate) struct Sequencer<P: SegmentPlayer, R: ResourceResolver> {
    queue: ActionQueue,
    player: P,
    resolver: Arc<R>,
    inputs: mpsc::UnboundedSender<Input>,
    epoch: u64,
    next_seq: u64,
}

impl<P: SegmentPlayer, R: ResourceResolver> Sequencer<P, R> {
    pub(crate) fn new(player: P, resolver: Arc<R>, inputs: mpsc::UnboundedSender<Input>) -> Self {
        Self {
            queue: ActionQueue::new(),
            player,
            resolver,
            inputs,
            epoch: 0,
            next_seq: 0,
        }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Tear down playback, forget the queue and invalidate every ticket issued so far.
    pub(crate) fn stop(&mut self) -> u64 {
        self.player.stop();
        self.queue.reset();
        self.epoch += 1;
        tracing::debug!("Sequencer moved to epoch {}", self.epoch);
        self.epoch
    }

    pub(crate) fn enqueue(&mut self, action: NarratedAction) {
        self.queue.enqueue(action);
    }

    /// Start the head of the queue if nothing is in flight.
    ///
    /// Returns the started action.
    pub(crate) fn process_next(&mut self) -> Option<NarratedAction> {
        let ticket = Ticket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        let action = self.queue.dequeue(ticket)?.clone();
        self.next_seq += 1;

        tracing::debug!("Starting {} ({:?})", action.tag, ticket);

        match action.audio.clone() {
            Some(audio) => {
                let resolver = Arc::clone(&self.resolver);
                let inputs = self.inputs.clone();
                tokio::spawn(async move {
                    let result = resolver.resolve(&audio).await;
                    let _ = inputs.send(Input::Resolved { ticket, result });
                });
            }
            None => {
                let _ = self.inputs.send(Input::Finished {
                    ticket,
                    outcome: PlaybackOutcome::Skipped,
                });
            }
        }

        Some(action)
    }

    /// Audio for the action under `ticket` is ready (or failed to load).
    pub(crate) fn on_resolved(
        &mut self,
        ticket: Ticket,
        result: Result<AudioClip, AudioError>,
    ) -> Option<Completion> {
        if !self.queue.is_current(ticket) {
            tracing::trace!("Discarding stale resolution {:?}", ticket);
            return None;
        }

        let clip = match result {
            Ok(clip) => clip,
            Err(e) => return self.finish(ticket, PlaybackOutcome::Failed(e)),
        };

        let (done_tx, done_rx) = oneshot::channel();
        if let Err(e) = self.player.play(clip, done_tx) {
            return self.finish(ticket, PlaybackOutcome::Failed(e));
        }
        if self.queue.is_paused() {
            self.player.pause();
        }

        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            // A dropped sender means the clip was torn down
            let outcome = done_rx.await.unwrap_or(PlaybackOutcome::Interrupted);
            let _ = inputs.send(Input::Finished { ticket, outcome });
        });

        None
    }

    /// Playback of the action under `ticket` ended.
    pub(crate) fn on_finished(
        &mut self,
        ticket: Ticket,
        outcome: PlaybackOutcome,
    ) -> Option<Completion> {
        self.finish(ticket, outcome)
    }

    fn finish(&mut self, ticket: Ticket, outcome: PlaybackOutcome) -> Option<Completion> {
        match self.queue.complete(ticket) {
            Some(action) => Some(Completion { action, outcome }),
            None => {
                tracing::trace!("Discarding stale completion {:?}", ticket);
                None
            }
        }
    }

    /// Cut the current action short and drop everything pending.
    pub(crate) fn interrupt(&mut self) -> Option<NarratedAction> {
        self.player.stop();
        self.queue.clear_pending();
        let interrupted = self.queue.interrupt();
        if let Some(action) = &interrupted {
            tracing::debug!("Interrupted {}", action.tag);
        }
        interrupted
    }

    pub(crate) fn pause(&mut self) {
        self.queue.set_paused(true);
        self.player.pause();
    }

    pub(crate) fn resume(&mut self) {
        self.queue.set_paused(false);
        self.player.resume();
    }

    pub(crate) fn is_processing(&self) -> bool {
        self.queue.is_processing()
    }

    pub(crate) fn last_completed(&self) -> Option<ActionTag> {
        self.queue.last_completed()
    }
}
