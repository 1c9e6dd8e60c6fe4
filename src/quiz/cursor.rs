//! Ordered question list with a current position.

use super::types::{Question, QuizError};

/// Result of moving the cursor forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// Moved to the question at this index
    Question(usize),
    /// Past the last question; the index stays on the last one
    Finished,
}

/// Cursor over a session's questions.
#[derive(Debug, Clone, Default)]
pub struct QuestionCursor {
    questions: Vec<Question>,
    position: usize,
    finished: bool,
}

impl QuestionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a question list and rewind to the first question.
    pub fn load(&mut self, questions: Vec<Question>) -> Result<(), QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuestionSet);
        }

        self.questions = questions;
        self.position = 0;
        self.finished = false;
        Ok(())
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.position)
    }

    pub fn current_mut(&mut self) -> Option<&mut Question> {
        self.questions.get_mut(self.position)
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Move to the next question, or report that the list is exhausted.
    pub fn advance(&mut self) -> CursorStep {
        if self.questions.is_empty() || self.finished {
            self.finished = !self.questions.is_empty();
            return CursorStep::Finished;
        }

        if self.has_next() {
            self.position += 1;
            CursorStep::Question(self.position)
        } else {
            self.finished = true;
            CursorStep::Finished
        }
    }

    /// Rewind to the first question and forget every answer.
    pub fn reset(&mut self) {
        self.position = 0;
        self.finished = false;
        for question in &mut self.questions {
            question.clear_answer();
        }
    }

    /// `position < count - 1`
    pub fn has_next(&self) -> bool {
        self.position + 1 < self.questions.len()
    }

    pub fn is_last(&self) -> bool {
        !self.questions.is_empty() && !self.has_next()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}
