//! Per-session aggregate.

use super::action::SessionState;
use super::{AnswerRejection, SessionError};
use crate::quiz::{AudioAssets, QuestionCursor, ScoreSummary, ScoreTracker, SessionConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Host and session intros
    #[default]
    Opening,
    /// Question loop
    Questions,
    /// Review through outro
    Closing,
    Closed,
}

/// Result of a successful answer selection.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub question_index: usize,
    pub question_id: String,
    pub option: String,
    pub correct: bool,
    pub score: ScoreSummary,
}

/// One quiz run. Owns its cursor and score.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub quiz_id: String,
    pub title: String,
    pub narrator: String,
    pub assets: AudioAssets,
    pub cursor: QuestionCursor,
    pub score: ScoreTracker,
    pub state: SessionState,
    pub stage: Stage,
}

impl Session {
    /// Validate a configuration and build a fresh session from it.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let mut cursor = QuestionCursor::new();
        cursor.load(config.questions)?;

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            quiz_id: config.quiz_id,
            title: config.title,
            narrator: config.narrator,
            assets: config.assets,
            cursor,
            score: ScoreTracker::new(),
            state: SessionState::Idle,
            stage: Stage::Opening,
        })
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Closed
    }

    pub fn is_awaiting_response(&self) -> bool {
        matches!(self.state, SessionState::AwaitingResponse(_))
    }

    /// Question index the session is waiting on.
    pub fn awaiting_question(&self) -> Option<usize> {
        match self.state {
            SessionState::AwaitingResponse(n) => Some(n),
            _ => None,
        }
    }

    /// Apply the listener's answer to the awaited question.
    ///
    /// Nothing changes unless the session is awaiting a response and the
    /// label is one of the question's options.
    pub fn select_answer(&mut self, label: &str) -> Result<AnswerResult, SessionError> {
        let index = self
            .awaiting_question()
            .ok_or(SessionError::InvalidAnswerSelection(
                AnswerRejection::NotAwaitingResponse,
            ))?;

        if self.cursor.position() != index {
            return Err(SessionError::InvalidState(format!(
                "awaiting question {} but cursor is at {}",
                index,
                self.cursor.position()
            )));
        }

        let question = self
            .cursor
            .current_mut()
            .ok_or_else(|| SessionError::InvalidState("cursor is empty".to_string()))?;
        // Unknown labels are rejected before the question is touched
        let correct = question.select(label)?;
        let question_id = question.id.clone();

        self.score.record_answer(&question_id, correct);

        Ok(AnswerResult {
            question_index: index,
            question_id,
            option: label.to_string(),
            correct,
            score: self.score.summarize(),
        })
    }

    /// Score the current question as unanswered, unless it already has an answer.
    ///
    /// Returns the question id when an outcome was recorded.
    pub fn record_no_response(&mut self) -> Option<String> {
        let question = self.cursor.current()?;
        if question.answered || self.score.outcome(&question.id).is_some() {
            return None;
        }

        let id = question.id.clone();
        self.score.record_no_response(&id);
        Some(id)
    }

    /// Rewind the cursor and clear the score.
    pub fn reset(&mut self) {
        self.cursor.reset();
        self.score.reset();
    }

    /// Mark the session finished.
    pub fn close(&mut self) {
        self.stage = Stage::Closed;
        self.state = SessionState::Closed;
    }
}
