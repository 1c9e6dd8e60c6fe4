//! Session orchestrator.
//!
//! Owns the transition table. Given the action that just completed and the
//! cursor position, [`transition`] decides what happens next; the
//! [`Orchestrator`] turns that decision into a concrete [`NarratedAction`]
//! by picking phrases from the session's assets.

use super::action::{ActionTag, NarratedAction};
use super::context::{Session, Stage};
use crate::quiz::{CursorStep, Phrase, PhraseSet};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Next step after an action completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Queue this action
    Play(ActionTag),
    /// Open the answer window for this question; nothing is queued
    AwaitResponse(usize),
    /// Move the cursor on, then play the next question or prepare the review
    Advance,
    /// Close the session
    Close,
}

/// External event that ends a question's answer window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Correct,
    Incorrect,
    NoResponse,
    Skipped,
}

/// Transition table.
///
/// `current` is the cursor position, used when leaving the session intro.
pub fn transition(completed: ActionTag, current: usize) -> Step {
    match completed {
        ActionTag::HostIntro => Step::Play(ActionTag::SessionIntro),
        ActionTag::SessionIntro => Step::Play(ActionTag::QuestionAudio(current)),
        ActionTag::QuestionAudio(n)
        | ActionTag::RepeatQuestion(n)
        | ActionTag::AwaitResponse(n) => Step::AwaitResponse(n),
        ActionTag::CorrectCallout(_) => Step::Advance,
        ActionTag::WrongCallout(n) | ActionTag::NoResponseCallout(n) => {
            Step::Play(ActionTag::Correction(n))
        }
        ActionTag::Correction(_) | ActionTag::SkipNotice(_) => Step::Advance,
        ActionTag::PrepareReview => Step::Play(ActionTag::SponsorMessage),
        ActionTag::SponsorMessage => Step::Play(ActionTag::Review),
        ActionTag::Review => Step::Play(ActionTag::Outro),
        ActionTag::Outro => Step::Play(ActionTag::Reset),
        ActionTag::Reset => Step::Close,
    }
}

/// Callout for an external response to question `n`.
pub fn respond(outcome: ResponseOutcome, n: usize) -> ActionTag {
    match outcome {
        ResponseOutcome::Correct => ActionTag::CorrectCallout(n),
        ResponseOutcome::Incorrect => ActionTag::WrongCallout(n),
        ResponseOutcome::NoResponse => ActionTag::NoResponseCallout(n),
        ResponseOutcome::Skipped => ActionTag::SkipNotice(n),
    }
}

/// Concrete outcome of [`Orchestrator::decide`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Enqueue(NarratedAction),
    AwaitResponse(usize),
    Close,
}

/// Builds narrated actions for a session.
///
/// The only nondeterminism is which variant of a phrase category is picked.
pub struct Orchestrator {
    rng: StdRng,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Orchestrator with reproducible phrase picks.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// First action of every session.
    pub fn opening(&mut self, session: &Session) -> NarratedAction {
        self.action(ActionTag::HostIntro, session)
    }

    /// Decide what follows `completed`, moving the cursor when the table says so.
    pub fn decide(&mut self, completed: ActionTag, session: &mut Session) -> Decision {
        let step = transition(completed, session.cursor.position());
        tracing::debug!("{} completed, next: {:?}", completed, step);

        let tag = match step {
            Step::Play(tag) => tag,
            Step::AwaitResponse(n) => return Decision::AwaitResponse(n),
            Step::Close => return Decision::Close,
            Step::Advance => match session.cursor.advance() {
                CursorStep::Question(n) => ActionTag::QuestionAudio(n),
                CursorStep::Finished => {
                    session.stage = Stage::Closing;
                    ActionTag::PrepareReview
                }
            },
        };

        if let ActionTag::QuestionAudio(_) = tag {
            session.stage = Stage::Questions;
        }
        Decision::Enqueue(self.action(tag, session))
    }

    /// Callout for an answer, a timeout or a skip on the current question.
    pub fn respond(&mut self, outcome: ResponseOutcome, session: &Session) -> NarratedAction {
        let tag = respond(outcome, session.cursor.position());
        self.action(tag, session)
    }

    /// Replay of the current question.
    pub fn repeat(&mut self, session: &Session) -> NarratedAction {
        self.action(ActionTag::RepeatQuestion(session.cursor.position()), session)
    }

    /// Build the action for `tag` from the session's assets.
    pub fn action(&mut self, tag: ActionTag, session: &Session) -> NarratedAction {
        let assets = &session.assets;

        match tag {
            ActionTag::HostIntro => {
                let fallback = format!("Welcome to {}.", session.title);
                self.phrase(tag, &assets.host.intro, &fallback)
            }
            ActionTag::SessionIntro => self.phrase(tag, &assets.session_intro, &session.title),
            ActionTag::QuestionAudio(n) | ActionTag::AwaitResponse(n) => {
                match session.cursor.get(n) {
                    Some(q) => NarratedAction::new(tag, q.prompt_audio.clone(), q.prompt.clone()),
                    None => NarratedAction::silent(tag, ""),
                }
            }
            ActionTag::RepeatQuestion(n) => {
                let question = match session.cursor.get(n) {
                    Some(q) => q,
                    None => return NarratedAction::silent(tag, ""),
                };
                let lead_in = assets.control.repeat.pick(&mut self.rng);
                let script = match lead_in {
                    Some(phrase) if !phrase.script.is_empty() => {
                        format!("{} {}", phrase.script, question.prompt)
                    }
                    _ => question.prompt.clone(),
                };
                let audio = question
                    .repeat_or_prompt_audio()
                    .cloned()
                    .or_else(|| lead_in.and_then(|p| p.audio.clone()));
                NarratedAction::new(tag, audio, script)
            }
            ActionTag::CorrectCallout(_) => self.phrase(tag, &assets.feedback.correct, "Correct!"),
            ActionTag::WrongCallout(_) => {
                self.phrase(tag, &assets.feedback.incorrect, "That's not right.")
            }
            ActionTag::NoResponseCallout(_) => {
                let set = if assets.feedback.no_response.is_empty() {
                    &assets.alerts
                } else {
                    &assets.feedback.no_response
                };
                self.phrase(tag, set, "Time's up.")
            }
            ActionTag::Correction(n) => {
                let question = match session.cursor.get(n) {
                    Some(q) => q,
                    None => return NarratedAction::silent(tag, ""),
                };
                let script = match question.correct_option() {
                    Some(label) => format!("The correct answer is {}.", label),
                    None => String::new(),
                };
                NarratedAction::new(tag, question.correction_audio.clone(), script)
            }
            ActionTag::SkipNotice(_) => {
                self.phrase(tag, &assets.control.skipped, "Skipping this question.")
            }
            ActionTag::PrepareReview => self.phrase(
                tag,
                &assets.host.prepare_review,
                "That's the last question. Let's see how you did.",
            ),
            ActionTag::SponsorMessage => self.phrase(tag, &assets.host.sponsor, ""),
            ActionTag::Review => {
                // Score narration is generated; only the recording comes from assets
                let script = session.score.summarize().review_script();
                let audio = assets
                    .host
                    .review
                    .pick(&mut self.rng)
                    .and_then(|p| p.audio.clone());
                NarratedAction::new(tag, audio, script)
            }
            ActionTag::Outro => self.phrase(tag, &assets.host.outro, "Thanks for playing."),
            ActionTag::Reset => NarratedAction::silent(tag, ""),
        }
    }

    fn phrase(&mut self, tag: ActionTag, set: &PhraseSet, fallback: &str) -> NarratedAction {
        match set.pick(&mut self.rng) {
            Some(Phrase { script, audio }) => {
                NarratedAction::new(tag, audio.clone(), script.clone())
            }
            None => NarratedAction::silent(tag, fallback),
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
