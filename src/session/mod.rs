//! Session Playback Module
//!
//! Sequences narrated actions for one quiz run, routes every audio
//! completion through a single runtime task, and exposes the imperative
//! controller used by the UI.

pub mod action;
pub mod context;
pub mod controller;
pub mod events;
pub mod orchestrator;
pub mod queue;
pub(crate) mod runtime;
pub(crate) mod sequencer;

use crate::audio::AudioError;
use crate::quiz::QuizError;
use thiserror::Error;

// Re-export main types
pub use action::{ActionTag, NarratedAction, SessionState};
pub use context::{AnswerResult, Session, Stage};
pub use controller::QuizController;
pub use events::{EventHub, SessionEvent, SessionSnapshot};
pub use orchestrator::{respond, transition, Decision, Orchestrator, ResponseOutcome, Step};
pub use queue::{ActionQueue, Ticket};

/// Why an answer was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerRejection {
    #[error("not awaiting a response")]
    NotAwaitingResponse,

    #[error("unknown option {0:?}")]
    UnknownOption(String),
}

/// Errors returned by session operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Session has no questions")]
    EmptyQuestionSet,

    #[error("Invalid question {id}: {reason}")]
    InvalidQuestion { id: String, reason: String },

    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    #[error("Invalid answer selection: {0}")]
    InvalidAnswerSelection(AnswerRejection),

    #[error("No active session")]
    NoActiveSession,

    #[error("A session is already active")]
    SessionAlreadyActive,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Session runtime is not running")]
    RuntimeUnavailable,

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
}

impl From<QuizError> for SessionError {
    fn from(error: QuizError) -> Self {
        match error {
            QuizError::EmptyQuestionSet => SessionError::EmptyQuestionSet,
            QuizError::InvalidQuestion { id, reason } => {
                SessionError::InvalidQuestion { id, reason }
            }
            QuizError::DuplicateQuestion(id) => SessionError::InvalidQuestion {
                id,
                reason: "duplicate question id".to_string(),
            },
            QuizError::UnknownOption(label) => {
                SessionError::InvalidAnswerSelection(AnswerRejection::UnknownOption(label))
            }
            QuizError::Parse(reason) => SessionError::InvalidConfig(reason),
        }
    }
}
