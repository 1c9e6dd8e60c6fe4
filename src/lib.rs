//! AudioQuiz - Narrated Audio Quiz Engine
//!
//! Library core for spoken quizzes. Sequences narrated segments (intros,
//! questions, feedback, review, outro) one at a time, runs a looping
//! background music layer with a volume envelope, and keeps per-question
//! answer state and score. Every transition is driven by audio completion.

pub mod audio;
pub mod quiz;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use audio::{AudioError, AudioRef, PlaybackOutcome};
pub use quiz::{Question, SessionConfig};
pub use session::{QuizController, SessionError, SessionEvent, SessionSnapshot};
pub use storage::config::EngineSettings;
