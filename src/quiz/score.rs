//! Per-question score records.
//!
//! One outcome per question id. Totals are always recomputed from the
//! records, never accumulated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a question ended for the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    NoResponse,
}

/// Aggregated score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub correct: usize,
    pub incorrect: usize,
    pub no_response: usize,
    /// Number of questions with a recorded outcome
    pub total: usize,
    /// Correct answers as a rounded percentage of `total`
    pub percentage: u8,
}

impl ScoreSummary {
    /// Narration line for the review segment.
    pub fn review_script(&self) -> String {
        let mut script = format!(
            "You answered {} of {} questions correctly, a score of {} percent.",
            self.correct, self.total, self.percentage
        );
        if self.no_response > 0 {
            script.push_str(&format!(
                " {} {} went unanswered.",
                self.no_response,
                if self.no_response == 1 { "question" } else { "questions" }
            ));
        }
        script
    }
}

/// Score records keyed by question id.
#[derive(Debug, Clone, Default)]
pub struct ScoreTracker {
    records: BTreeMap<String, AnswerOutcome>,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer; a repeat id overwrites the earlier outcome.
    pub fn record_answer(&mut self, question_id: &str, correct: bool) {
        let outcome = if correct {
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect
        };
        self.records.insert(question_id.to_string(), outcome);
    }

    /// Record that the question went unanswered.
    pub fn record_no_response(&mut self, question_id: &str) {
        self.records
            .insert(question_id.to_string(), AnswerOutcome::NoResponse);
    }

    pub fn outcome(&self, question_id: &str) -> Option<AnswerOutcome> {
        self.records.get(question_id).copied()
    }

    /// Compute the summary from the full record set.
    pub fn summarize(&self) -> ScoreSummary {
        let count = |wanted: AnswerOutcome| self.records.values().filter(|o| **o == wanted).count();

        let correct = count(AnswerOutcome::Correct);
        let total = self.records.len();
        let percentage = if total == 0 {
            0
        } else {
            ((correct as f64 * 100.0) / total as f64).round() as u8
        };

        ScoreSummary {
            correct,
            incorrect: count(AnswerOutcome::Incorrect),
            no_response: count(AnswerOutcome::NoResponse),
            total,
            percentage,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }
}
