//! Quiz content types.
//!
//! Questions, narration phrases and the session configuration handed in by
//! the host application.

use crate::audio::AudioRef;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// One quiz item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique reference id
    pub id: String,
    /// Owning quiz
    #[serde(default)]
    pub quiz_id: String,
    /// Topic tag
    #[serde(default)]
    pub topic: String,
    /// Prompt text
    pub prompt: String,
    /// Option label to correctness; exactly one entry is true
    pub options: BTreeMap<String, bool>,
    /// Narrated prompt
    #[serde(default)]
    pub prompt_audio: Option<AudioRef>,
    /// Narrated correction, played after a wrong or missing answer
    #[serde(default)]
    pub correction_audio: Option<AudioRef>,
    /// Narrated repeat of the prompt
    #[serde(default)]
    pub repeat_audio: Option<AudioRef>,
    /// Option picked by the listener
    #[serde(skip)]
    pub selected_option: Option<String>,
    #[serde(skip)]
    pub answered: bool,
    #[serde(skip)]
    pub answered_correctly: bool,
}

impl Question {
    /// Create a question with no audio.
    pub fn new<L: Into<String>>(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: impl IntoIterator<Item = (L, bool)>,
    ) -> Self {
        Self {
            id: id.into(),
            quiz_id: String::new(),
            topic: String::new(),
            prompt: prompt.into(),
            options: options.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            prompt_audio: None,
            correction_audio: None,
            repeat_audio: None,
            selected_option: None,
            answered: false,
            answered_correctly: false,
        }
    }

    pub fn with_prompt_audio(mut self, audio: impl Into<AudioRef>) -> Self {
        self.prompt_audio = Some(audio.into());
        self
    }

    pub fn with_correction_audio(mut self, audio: impl Into<AudioRef>) -> Self {
        self.correction_audio = Some(audio.into());
        self
    }

    pub fn with_repeat_audio(mut self, audio: impl Into<AudioRef>) -> Self {
        self.repeat_audio = Some(audio.into());
        self
    }

    /// Check the question is playable: an id, options, one correct answer.
    pub fn validate(&self) -> Result<(), QuizError> {
        let invalid = |reason: &str| QuizError::InvalidQuestion {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("missing id"));
        }
        if self.options.is_empty() {
            return Err(invalid("no answer options"));
        }
        if self.options.keys().any(|label| label.trim().is_empty()) {
            return Err(invalid("empty option label"));
        }

        match self.options.values().filter(|correct| **correct).count() {
            1 => Ok(()),
            0 => Err(invalid("no correct option")),
            _ => Err(invalid("more than one correct option")),
        }
    }

    /// Label of the correct option.
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|(_, correct)| **correct)
            .map(|(label, _)| label.as_str())
    }

    /// Correctness of a label, `None` if the label is not declared.
    pub fn is_correct(&self, label: &str) -> Option<bool> {
        self.options.get(label).copied()
    }

    /// Record the listener's choice and return whether it was correct.
    ///
    /// Unknown labels are rejected before anything is changed.
    pub fn select(&mut self, label: &str) -> Result<bool, QuizError> {
        let correct = self
            .is_correct(label)
            .ok_or_else(|| QuizError::UnknownOption(label.to_string()))?;

        self.selected_option = Some(label.to_string());
        self.answered = true;
        self.answered_correctly = correct;
        Ok(correct)
    }

    /// Forget any recorded answer.
    pub fn clear_answer(&mut self) {
        self.selected_option = None;
        self.answered = false;
        self.answered_correctly = false;
    }

    /// Audio for a repeat request, falling back to the prompt.
    pub fn repeat_or_prompt_audio(&self) -> Option<&AudioRef> {
        self.repeat_audio.as_ref().or(self.prompt_audio.as_ref())
    }
}

/// A line of narration with its optional recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub script: String,
    #[serde(default)]
    pub audio: Option<AudioRef>,
}

impl Phrase {
    pub fn new(script: impl Into<String>, audio: impl Into<AudioRef>) -> Self {
        Self {
            script: script.into(),
            audio: Some(audio.into()),
        }
    }

    /// A phrase with no recording.
    pub fn script_only(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            audio: None,
        }
    }
}

/// Interchangeable variants of one phrase category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhraseSet(pub Vec<Phrase>);

impl PhraseSet {
    pub fn new(phrases: Vec<Phrase>) -> Self {
        Self(phrases)
    }

    /// Pick one variant at random; a single variant is always picked.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Phrase> {
        match self.0.len() {
            0 => None,
            1 => self.0.first(),
            n => self.0.get(rng.gen_range(0..n)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<Phrase>> for PhraseSet {
    fn from(phrases: Vec<Phrase>) -> Self {
        Self(phrases)
    }
}

/// Host narration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostPhrases {
    pub intro: PhraseSet,
    pub prepare_review: PhraseSet,
    pub sponsor: PhraseSet,
    pub review: PhraseSet,
    pub outro: PhraseSet,
}

/// Answer feedback callouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackPhrases {
    pub correct: PhraseSet,
    pub incorrect: PhraseSet,
    pub no_response: PhraseSet,
}

/// Narration for listener controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPhrases {
    pub skipped: PhraseSet,
    pub repeat: PhraseSet,
}

/// Every narration category a session can draw from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioAssets {
    pub host: HostPhrases,
    pub session_intro: PhraseSet,
    pub feedback: FeedbackPhrases,
    pub control: ControlPhrases,
    /// Short cues, used when a no-response callout has no phrase of its own
    pub alerts: PhraseSet,
    /// Candidate ambience tracks
    pub background_music: Vec<AudioRef>,
}

/// Everything needed to start a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub quiz_id: String,
    #[serde(default)]
    pub title: String,
    /// Voice / narrator identifier
    #[serde(default)]
    pub narrator: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub assets: AudioAssets,
}

impl SessionConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        serde_json::from_str(json).map_err(|e| QuizError::Parse(e.to_string()))
    }

    /// Check the question set before a session is created.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.questions.is_empty() {
            return Err(QuizError::EmptyQuestionSet);
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            question.validate()?;
            if !seen.insert(question.id.as_str()) {
                return Err(QuizError::DuplicateQuestion(question.id.clone()));
            }
        }
        Ok(())
    }
}

/// Errors raised by quiz content.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    /// No questions to play
    #[error("Session has no questions")]
    EmptyQuestionSet,

    #[error("Invalid question {id}: {reason}")]
    InvalidQuestion { id: String, reason: String },

    #[error("Duplicate question id: {0}")]
    DuplicateQuestion(String),

    /// Option label not declared by the question
    #[error("Unknown answer option: {0}")]
    UnknownOption(String),

    #[error("Failed to parse session config: {0}")]
    Parse(String),
}
