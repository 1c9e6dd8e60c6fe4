//! Observable session output: an event stream and a state snapshot.

use super::action::{ActionTag, SessionState};
use super::context::Stage;
use crate::audio::{AudioError, PlaybackOutcome};
use crate::quiz::ScoreSummary;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

/// Events published by the session runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was created
    Started {
        session_id: Uuid,
        title: String,
        question_count: usize,
    },
    /// An action was dequeued and handed to playback
    ActionStarted { tag: ActionTag, script: String },
    /// An action finished (successfully or not)
    ActionCompleted {
        tag: ActionTag,
        outcome: PlaybackOutcome,
    },
    /// A new question is about to be narrated
    QuestionChanged {
        index: usize,
        count: usize,
        prompt: String,
    },
    /// Answer controls are open
    AwaitingResponse { index: usize },
    AnswerRecorded {
        index: usize,
        question_id: String,
        option: String,
        correct: bool,
    },
    /// The question was scored as unanswered
    NoResponse { index: usize, question_id: String },
    ScoreUpdated(ScoreSummary),
    /// Recoverable audio problem; the session carries on
    Warning {
        tag: Option<ActionTag>,
        error: AudioError,
    },
    Paused,
    Resumed,
    /// The closing sequence finished
    Closed { summary: ScoreSummary },
    /// The session was stopped by the listener
    Stopped,
}

/// Point-in-time view of the session for the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub title: String,
    pub state: SessionState,
    pub stage: Option<Stage>,
    /// Script of the current or last narration
    pub narration: String,
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_awaiting_response: bool,
    pub question_index: usize,
    pub question_count: usize,
    pub score: ScoreSummary,
}

impl SessionSnapshot {
    pub fn is_active(&self) -> bool {
        matches!(self.stage, Some(stage) if stage != Stage::Closed)
    }
}

/// Fan-out for events and snapshots.
pub struct EventHub {
    events: broadcast::Sender<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self { events, snapshot }
    }

    /// Publish an event; having no subscribers is fine.
    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!("Session event: {:?}", event);
        let _ = self.events.send(event);
    }

    /// Replace the current snapshot.
    pub fn update(&self, snapshot: SessionSnapshot) {
        self.snapshot.send_replace(snapshot);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(100)
    }
}
