//! Quiz content: questions, narration assets, cursor and score.

pub mod cursor;
pub mod score;
pub mod types;

pub use cursor::{CursorStep, QuestionCursor};
pub use score::{AnswerOutcome, ScoreSummary, ScoreTracker};
pub use types::{
    AudioAssets, ControlPhrases, FeedbackPhrases, HostPhrases, Phrase, PhraseSet, Question,
    QuizError, SessionConfig,
};
