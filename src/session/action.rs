//! Narrated actions and session states.

use crate::audio::AudioRef;
use serde::{Deserialize, Serialize};

/// Kind of narrated action. Question-bound tags carry the question index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    HostIntro,
    SessionIntro,
    QuestionAudio(usize),
    /// State marker only; never queued
    AwaitResponse(usize),
    RepeatQuestion(usize),
    CorrectCallout(usize),
    WrongCallout(usize),
    NoResponseCallout(usize),
    Correction(usize),
    SkipNotice(usize),
    PrepareReview,
    SponsorMessage,
    Review,
    Outro,
    Reset,
}

impl ActionTag {
    /// Question this action belongs to, if any.
    pub fn question(&self) -> Option<usize> {
        match *self {
            ActionTag::QuestionAudio(n)
            | ActionTag::AwaitResponse(n)
            | ActionTag::RepeatQuestion(n)
            | ActionTag::CorrectCallout(n)
            | ActionTag::WrongCallout(n)
            | ActionTag::NoResponseCallout(n)
            | ActionTag::Correction(n)
            | ActionTag::SkipNotice(n) => Some(n),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionTag::HostIntro => write!(f, "Host Intro"),
            ActionTag::SessionIntro => write!(f, "Session Intro"),
            ActionTag::QuestionAudio(n) => write!(f, "Question {}", n + 1),
            ActionTag::AwaitResponse(n) => write!(f, "Await Response {}", n + 1),
            ActionTag::RepeatQuestion(n) => write!(f, "Repeat Question {}", n + 1),
            ActionTag::CorrectCallout(n) => write!(f, "Correct Callout {}", n + 1),
            ActionTag::WrongCallout(n) => write!(f, "Wrong Callout {}", n + 1),
            ActionTag::NoResponseCallout(n) => write!(f, "No Response Callout {}", n + 1),
            ActionTag::Correction(n) => write!(f, "Correction {}", n + 1),
            ActionTag::SkipNotice(n) => write!(f, "Skip Notice {}", n + 1),
            ActionTag::PrepareReview => write!(f, "Prepare Review"),
            ActionTag::SponsorMessage => write!(f, "Sponsor Message"),
            ActionTag::Review => write!(f, "Review"),
            ActionTag::Outro => write!(f, "Outro"),
            ActionTag::Reset => write!(f, "Reset"),
        }
    }
}

/// One playable unit of narration.
#[derive(Debug, Clone, PartialEq)]
pub struct NarratedAction {
    pub tag: ActionTag,
    /// At most one recording; `None` completes immediately
    pub audio: Option<AudioRef>,
    /// Text shown while the action plays
    pub script: String,
}

impl NarratedAction {
    pub fn new(tag: ActionTag, audio: Option<AudioRef>, script: impl Into<String>) -> Self {
        Self {
            tag,
            audio,
            script: script.into(),
        }
    }

    /// An action with no recording.
    pub fn silent(tag: ActionTag, script: impl Into<String>) -> Self {
        Self::new(tag, None, script)
    }
}

/// Where the session is. Outside `AwaitingResponse` this is the last
/// completed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    HostIntro,
    SessionIntro,
    QuestionAudio(usize),
    RepeatQuestion(usize),
    AwaitingResponse(usize),
    CorrectCallout(usize),
    WrongCallout(usize),
    NoResponseCallout(usize),
    Correction(usize),
    SkipNotice(usize),
    PrepareReview,
    SponsorMessage,
    Review,
    Outro,
    Closed,
}

impl From<ActionTag> for SessionState {
    fn from(tag: ActionTag) -> Self {
        match tag {
            ActionTag::HostIntro => SessionState::HostIntro,
            ActionTag::SessionIntro => SessionState::SessionIntro,
            ActionTag::QuestionAudio(n) => SessionState::QuestionAudio(n),
            ActionTag::AwaitResponse(n) => SessionState::AwaitingResponse(n),
            ActionTag::RepeatQuestion(n) => SessionState::RepeatQuestion(n),
            ActionTag::CorrectCallout(n) => SessionState::CorrectCallout(n),
            ActionTag::WrongCallout(n) => SessionState::WrongCallout(n),
            ActionTag::NoResponseCallout(n) => SessionState::NoResponseCallout(n),
            ActionTag::Correction(n) => SessionState::Correction(n),
            ActionTag::SkipNotice(n) => SessionState::SkipNotice(n),
            ActionTag::PrepareReview => SessionState::PrepareReview,
            ActionTag::SponsorMessage => SessionState::SponsorMessage,
            ActionTag::Review => SessionState::Review,
            ActionTag::Outro => SessionState::Outro,
            ActionTag::Reset => SessionState::Closed,
        }
    }
}
