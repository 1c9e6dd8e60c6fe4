//! Session runtime.
//!
//! One task owns the session, the sequencer, the orchestrator and the music
//! loop, and consumes a single input channel. Commands, audio resolutions,
//! player completions and timers are all handled here, one at a time, in
//! arrival order.

use super::action::{ActionTag, NarratedAction, SessionState};
use super::context::{AnswerResult, Session, Stage};
use super::events::{EventHub, SessionEvent, SessionSnapshot};
use super::orchestrator::{Decision, Orchestrator, ResponseOutcome};
use super::queue::Ticket;
use super::sequencer::{Completion, Sequencer};
use super::SessionError;
use crate::audio::{
    AudioClip, AudioError, BackgroundMusicLoop, MusicOutput, PlaybackOutcome, ResourceResolver,
    SegmentPlayer,
};
use crate::quiz::SessionConfig;
use crate::storage::config::EngineSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Requests from the controller.
pub(crate) enum Command {
    Start {
        config: SessionConfig,
        reply: Reply<Uuid>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    SelectAnswer {
        label: String,
        reply: Reply<AnswerResult>,
    },
    Skip {
        reply: Reply<()>,
    },
    Repeat {
        reply: Reply<()>,
    },
    Stop {
        reply: Reply<()>,
    },
}

/// Everything the runtime reacts to.
pub(crate) enum Input {
    Command(Command),
    Resolved {
        ticket: Ticket,
        result: Result<AudioClip, AudioError>,
    },
    Finished {
        ticket: Ticket,
        outcome: PlaybackOutcome,
    },
    Settled {
        epoch: u64,
    },
    ResponseTimeout {
        epoch: u64,
        window: u64,
    },
    MusicFailed {
        epoch: u64,
        error: AudioError,
    },
    Shutdown,
}

pub(crate) struct SessionRuntime<P, R, O>
where
    P: SegmentPlayer,
    R: ResourceResolver,
    O: MusicOutput,
{
    sequencer: Sequencer<P, R>,
    music: BackgroundMusicLoop<O, R>,
    orchestrator: Orchestrator,
    session: Option<Session>,
    hub: EventHub,
    inputs: mpsc::UnboundedSender<Input>,
    settle_delay: Duration,
    /// When the pending settle timer fires, if one is pending
    settle_due: Option<Instant>,
    response_window: Option<Duration>,
    response_timer: Option<JoinHandle<()>>,
    window_id: u64,
    paused: bool,
    narration: String,
}

impl<P, R, O> SessionRuntime<P, R, O>
where
    P: SegmentPlayer,
    R: ResourceResolver,
    O: MusicOutput,
{
    pub(crate) fn new(
        settings: &EngineSettings,
        player: P,
        resolver: R,
        music_output: O,
        hub: EventHub,
        inputs: mpsc::UnboundedSender<Input>,
    ) -> Self {
        let resolver = Arc::new(resolver);
        let playback = &settings.playback;

        let mut music = BackgroundMusicLoop::new(Arc::new(music_output), Arc::clone(&resolver))
            .with_envelope(settings.music.envelope())
            .with_enabled(settings.music.enabled);
        let orchestrator = match playback.variant_seed {
            Some(seed) => {
                music = music.with_seed(seed);
                Orchestrator::with_seed(seed)
            }
            None => Orchestrator::new(),
        };

        Self {
            sequencer: Sequencer::new(player, resolver, inputs.clone()),
            music,
            orchestrator,
            session: None,
            hub,
            inputs,
            settle_delay: playback.settle_delay(),
            settle_due: None,
            response_window: playback.response_window(),
            response_timer: None,
            window_id: 0,
            paused: false,
            narration: String::new(),
        }
    }

    /// Consume inputs until shutdown.
    pub(crate) async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        tracing::debug!("Session runtime started");

        while let Some(input) = inputs.recv().await {
            if !self.handle(input) {
                break;
            }
        }

        self.teardown();
        tracing::debug!("Session runtime stopped");
    }

    fn handle(&mut self, input: Input) -> bool {
        match input {
            Input::Command(command) => self.handle_command(command),
            Input::Resolved { ticket, result } => {
                if let Some(completion) = self.sequencer.on_resolved(ticket, result) {
                    self.complete(completion);
                }
            }
            Input::Finished { ticket, outcome } => {
                if let Some(completion) = self.sequencer.on_finished(ticket, outcome) {
                    self.complete(completion);
                }
            }
            Input::Settled { epoch } => {
                if epoch == self.sequencer.epoch() {
                    self.settle_due = None;
                    self.pump();
                }
            }
            Input::ResponseTimeout { epoch, window } => {
                if epoch == self.sequencer.epoch() && window == self.window_id {
                    self.response_timed_out();
                }
            }
            Input::MusicFailed { epoch, error } => {
                if epoch == self.sequencer.epoch() {
                    self.hub.publish(SessionEvent::Warning { tag: None, error });
                }
            }
            Input::Shutdown => return false,
        }
        true
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { config, reply } => {
                let _ = reply.send(self.start(config));
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            Command::SelectAnswer { label, reply } => {
                let _ = reply.send(self.select_answer(&label));
            }
            Command::Skip { reply } => {
                let _ = reply.send(self.skip_question());
            }
            Command::Repeat { reply } => {
                let _ = reply.send(self.repeat_question());
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
        }
        self.refresh();
    }

    fn start(&mut self, config: SessionConfig) -> Result<Uuid, SessionError> {
        if self.session.as_ref().map(|s| s.is_active()).unwrap_or(false) {
            return Err(SessionError::SessionAlreadyActive);
        }

        let session = Session::new(config)?;
        let id = session.id;
        let epoch = self.sequencer.stop();

        self.cancel_response_timer();
        self.settle_due = None;
        self.paused = false;
        self.narration.clear();

        let inputs = self.inputs.clone();
        self.music.set_failure_hook(Some(Arc::new(move |error: AudioError| {
            let _ = inputs.send(Input::MusicFailed { epoch, error });
        })));
        self.music.start(&session.assets.background_music);

        tracing::info!(
            "Session {} started: {} ({} questions)",
            id,
            session.title,
            session.cursor.len()
        );
        self.hub.publish(SessionEvent::Started {
            session_id: id,
            title: session.title.clone(),
            question_count: session.cursor.len(),
        });

        let opening = self.orchestrator.opening(&session);
        self.session = Some(session);
        self.sequencer.enqueue(opening);
        self.pump();

        Ok(id)
    }

    fn pause(&mut self) -> Result<(), SessionError> {
        self.active_session()?;
        if self.paused {
            return Err(SessionError::InvalidState("session already paused".to_string()));
        }

        self.paused = true;
        self.sequencer.pause();
        self.cancel_response_timer();

        tracing::info!("Session paused");
        self.hub.publish(SessionEvent::Paused);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SessionError> {
        let awaiting = self.active_session()?.is_awaiting_response();
        if !self.paused {
            return Err(SessionError::InvalidState("session not paused".to_string()));
        }

        self.paused = false;
        self.sequencer.resume();
        if awaiting {
            self.arm_response_timer();
        }

        tracing::info!("Session resumed");
        self.hub.publish(SessionEvent::Resumed);

        // Inside the settle window the pending timer starts the next action
        let settling = self
            .settle_due
            .map(|due| Instant::now() < due)
            .unwrap_or(false);
        if !settling {
            self.pump();
        }
        Ok(())
    }

    fn select_answer(&mut self, label: &str) -> Result<AnswerResult, SessionError> {
        let session = self.active_session()?;
        let result = session.select_answer(label)?;
        self.leave_awaiting();

        tracing::info!(
            "Answer {} for question {}: {}",
            result.option,
            result.question_id,
            if result.correct { "correct" } else { "incorrect" }
        );
        self.hub.publish(SessionEvent::AnswerRecorded {
            index: result.question_index,
            question_id: result.question_id.clone(),
            option: result.option.clone(),
            correct: result.correct,
        });
        self.hub.publish(SessionEvent::ScoreUpdated(result.score));

        let outcome = if result.correct {
            ResponseOutcome::Correct
        } else {
            ResponseOutcome::Incorrect
        };
        self.respond(outcome);
        Ok(result)
    }

    fn skip_question(&mut self) -> Result<(), SessionError> {
        let session = self.active_session()?;
        if session.stage != Stage::Questions {
            return Err(SessionError::InvalidState(
                "no question to skip".to_string(),
            ));
        }

        let index = session.cursor.position();
        if let Some(question_id) = session.record_no_response() {
            self.hub.publish(SessionEvent::NoResponse { index, question_id });
        }

        self.sequencer.interrupt();
        self.leave_awaiting();

        tracing::info!("Skipping question {}", index + 1);
        self.respond(ResponseOutcome::Skipped);
        Ok(())
    }

    fn repeat_question(&mut self) -> Result<(), SessionError> {
        let session = self.active_session()?;
        if !session.is_awaiting_response() {
            return Err(SessionError::InvalidState(
                "not awaiting a response".to_string(),
            ));
        }

        self.leave_awaiting();
        if let Some(session) = self.session.as_ref() {
            let action = self.orchestrator.repeat(session);
            self.sequencer.enqueue(action);
        }
        self.pump();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        let session = self.active_session()?;

        session.reset();
        session.close();

        self.sequencer.stop();
        self.music.stop();
        self.cancel_response_timer();
        self.settle_due = None;
        self.paused = false;
        self.narration.clear();

        tracing::info!("Session stopped");
        self.hub.publish(SessionEvent::Stopped);
        Ok(())
    }

    fn response_timed_out(&mut self) {
        let index = match self.session.as_ref().and_then(|s| s.awaiting_question()) {
            Some(index) if !self.paused => index,
            _ => return,
        };

        if let Some(question_id) = self.session.as_mut().and_then(|s| s.record_no_response()) {
            tracing::info!("No response to question {}", index + 1);
            self.hub.publish(SessionEvent::NoResponse { index, question_id });
        }

        self.leave_awaiting();
        self.respond(ResponseOutcome::NoResponse);
        self.refresh();
    }

    /// Queue the callout for a response and start it right away.
    fn respond(&mut self, outcome: ResponseOutcome) {
        if let Some(session) = self.session.as_ref() {
            let action = self.orchestrator.respond(outcome, session);
            self.sequencer.enqueue(action);
        }
        if let Some(score) = self.session.as_ref().map(|s| s.score.summarize()) {
            if outcome == ResponseOutcome::NoResponse || outcome == ResponseOutcome::Skipped {
                self.hub.publish(SessionEvent::ScoreUpdated(score));
            }
        }
        self.pump();
    }

    /// Handle an accepted completion: record it and ask the orchestrator what's next.
    fn complete(&mut self, completion: Completion) {
        let Completion { action, outcome } = completion;
        let tag = action.tag;

        if let PlaybackOutcome::Failed(error) = &outcome {
            if error.is_recoverable() {
                tracing::warn!("{} could not be played: {}", tag, error);
            } else {
                tracing::error!("{} could not be played, narration is silent: {}", tag, error);
            }
            self.hub.publish(SessionEvent::Warning {
                tag: Some(tag),
                error: error.clone(),
            });
        }
        self.hub.publish(SessionEvent::ActionCompleted { tag, outcome });

        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return,
        };
        session.state = SessionState::from(tag);

        match self.orchestrator.decide(tag, session) {
            Decision::Enqueue(next) => {
                self.announce(&next);
                self.sequencer.enqueue(next);
                self.schedule_settle();
            }
            Decision::AwaitResponse(index) => {
                session.state = SessionState::AwaitingResponse(index);
                tracing::debug!("Awaiting response to question {}", index + 1);
                self.hub.publish(SessionEvent::AwaitingResponse { index });
                if !self.paused {
                    self.arm_response_timer();
                }
            }
            Decision::Close => self.close(),
        }

        self.refresh();
    }

    /// Publish the events that accompany certain actions being queued.
    fn announce(&self, next: &NarratedAction) {
        let session = match self.session.as_ref() {
            Some(session) => session,
            None => return,
        };

        match next.tag {
            ActionTag::QuestionAudio(index) => {
                self.hub.publish(SessionEvent::QuestionChanged {
                    index,
                    count: session.cursor.len(),
                    prompt: next.script.clone(),
                });
            }
            ActionTag::Review => {
                self.hub
                    .publish(SessionEvent::ScoreUpdated(session.score.summarize()));
            }
            _ => {}
        }
    }

    fn close(&mut self) {
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return,
        };

        let summary = session.score.summarize();
        let id = session.id;
        session.close();
        session.reset();

        self.music.stop();
        self.cancel_response_timer();

        tracing::info!(
            "Session {} closed: {}/{} correct",
            id,
            summary.correct,
            summary.total
        );
        self.hub.publish(SessionEvent::Closed { summary });
    }

    /// Start the next queued action, if the queue allows it.
    fn pump(&mut self) {
        if let Some(action) = self.sequencer.process_next() {
            self.narration = action.script.clone();
            self.hub.publish(SessionEvent::ActionStarted {
                tag: action.tag,
                script: action.script,
            });
        }
        self.refresh();
    }

    fn schedule_settle(&mut self) {
        let epoch = self.sequencer.epoch();
        let delay = self.settle_delay;
        let inputs = self.inputs.clone();
        self.settle_due = Some(Instant::now() + delay);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inputs.send(Input::Settled { epoch });
        });
    }

    fn arm_response_timer(&mut self) {
        self.cancel_response_timer();

        let window = match self.response_window {
            Some(window) => window,
            None => return,
        };
        let epoch = self.sequencer.epoch();
        let window_id = self.window_id;
        let inputs = self.inputs.clone();

        self.response_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = inputs.send(Input::ResponseTimeout {
                epoch,
                window: window_id,
            });
        }));
    }

    fn cancel_response_timer(&mut self) {
        self.window_id += 1;
        if let Some(timer) = self.response_timer.take() {
            timer.abort();
        }
    }

    /// Close the answer window; the state falls back to the last completed action.
    fn leave_awaiting(&mut self) {
        self.cancel_response_timer();
        let last = self.sequencer.last_completed();
        if let Some(session) = self.session.as_mut() {
            if session.is_awaiting_response() {
                session.state = last.map(SessionState::from).unwrap_or_default();
            }
        }
    }

    fn active_session(&mut self) -> Result<&mut Session, SessionError> {
        self.session
            .as_mut()
            .filter(|s| s.is_active())
            .ok_or(SessionError::NoActiveSession)
    }

    fn refresh(&self) {
        let snapshot = match self.session.as_ref() {
            None => SessionSnapshot::default(),
            Some(session) => SessionSnapshot {
                session_id: Some(session.id),
                title: session.title.clone(),
                state: session.state,
                stage: Some(session.stage),
                narration: self.narration.clone(),
                is_playing: self.sequencer.is_processing() && !self.paused,
                is_paused: self.paused,
                is_awaiting_response: session.is_awaiting_response(),
                question_index: session.cursor.position(),
                question_count: session.cursor.len(),
                score: session.score.summarize(),
            },
        };
        self.hub.update(snapshot);
    }

    fn teardown(&mut self) {
        self.sequencer.stop();
        self.music.stop();
        self.cancel_response_timer();
    }
}
