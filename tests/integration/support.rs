//! Scripted playback doubles and a session harness.
//!
//! The mock player never finishes on its own: tests decide when the current
//! clip completes. Torn-down clips keep their completion sender so a test can
//! fire it late and check it is ignored.

#![allow(dead_code)]

use audioquiz::audio::{
    AudioClip, AudioError, AudioRef, MusicOutput, PlaybackOutcome, ResourceResolver, SegmentPlayer,
};
use audioquiz::quiz::{
    AudioAssets, ControlPhrases, FeedbackPhrases, HostPhrases, Phrase, PhraseSet, Question,
    SessionConfig,
};
use audioquiz::session::{ActionTag, QuizController, SessionEvent};
use audioquiz::storage::config::EngineSettings;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

#[derive(Default)]
struct PlayerState {
    played: Vec<String>,
    current: Option<oneshot::Sender<PlaybackOutcome>>,
    detached: Vec<oneshot::Sender<PlaybackOutcome>>,
    paused: bool,
    stops: usize,
    failures: HashMap<String, AudioError>,
}

/// Segment player driven by the test.
#[derive(Clone, Default)]
pub struct MockPlayer {
    state: Arc<Mutex<PlayerState>>,
}

impl MockPlayer {
    pub fn played(&self) -> Vec<String> {
        self.state.lock().unwrap().played.clone()
    }

    pub fn last_played(&self) -> Option<String> {
        self.state.lock().unwrap().played.last().cloned()
    }

    /// Finish the clip that is playing now.
    pub fn complete_current(&self) -> bool {
        let sender = self.state.lock().unwrap().current.take();
        match sender {
            Some(done) => done.send(PlaybackOutcome::Finished).is_ok(),
            None => false,
        }
    }

    /// Deliver completions for clips that were already torn down.
    pub fn fire_detached(&self) -> usize {
        let senders: Vec<_> = self.state.lock().unwrap().detached.drain(..).collect();
        senders
            .into_iter()
            .filter(|done| !done.is_closed())
            .map(|done| done.send(PlaybackOutcome::Finished))
            .filter(Result::is_ok)
            .count()
    }

    /// Make `play` fail for a source.
    pub fn fail_on(&self, source: &str, error: AudioError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(source.to_string(), error);
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn has_current(&self) -> bool {
        self.state.lock().unwrap().current.is_some()
    }
}

impl SegmentPlayer for MockPlayer {
    fn play(
        &mut self,
        clip: AudioClip,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        let source = clip.source().to_string();

        if let Some(error) = state.failures.get(&source) {
            return Err(error.clone());
        }
        if let Some(previous) = state.current.take() {
            state.detached.push(previous);
        }

        state.played.push(source);
        state.current = Some(done);
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().paused = true;
    }

    fn resume(&mut self) {
        self.state.lock().unwrap().paused = false;
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.current.take() {
            state.detached.push(previous);
        }
        state.stops += 1;
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.current.is_some() && !state.paused
    }
}

/// Resolver that echoes the reference as the clip bytes.
#[derive(Clone, Default)]
pub struct MockResolver {
    failures: Arc<Mutex<HashMap<String, AudioError>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    pub fn fail(&self, source: &str, error: AudioError) {
        self.failures
            .lock()
            .unwrap()
            .insert(source.to_string(), error);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl ResourceResolver for MockResolver {
    async fn resolve(&self, resource: &AudioRef) -> Result<AudioClip, AudioError> {
        self.requests.lock().unwrap().push(resource.to_string());

        if let Some(error) = self.failures.lock().unwrap().get(resource.as_str()) {
            return Err(error.clone());
        }
        Ok(AudioClip::new(
            resource.clone(),
            resource.as_str().as_bytes().to_vec(),
        ))
    }
}

#[derive(Default)]
struct MusicState {
    started: Vec<String>,
    volumes: Vec<f32>,
    stops: usize,
    playing: bool,
}

/// Music output that records what it is told.
#[derive(Clone, Default)]
pub struct MockMusicOutput {
    state: Arc<Mutex<MusicState>>,
}

impl MockMusicOutput {
    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.state.lock().unwrap().volumes.clone()
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.state.lock().unwrap().volumes.last().copied()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }
}

impl MusicOutput for MockMusicOutput {
    fn start(&self, clip: AudioClip, volume: f32) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        state.started.push(clip.source().to_string());
        state.volumes.push(volume);
        state.playing = true;
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().unwrap().volumes.push(volume);
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.stops += 1;
        state.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

/// A controller wired to mocks, plus an event subscription.
pub struct Harness {
    pub controller: QuizController,
    pub player: MockPlayer,
    pub resolver: MockResolver,
    pub music: MockMusicOutput,
    pub events: broadcast::Receiver<SessionEvent>,
}

/// Route engine logs to the test writer; `RUST_LOG=audioquiz=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        init_tracing();
        let player = MockPlayer::default();
        let resolver = MockResolver::default();
        let music = MockMusicOutput::default();

        let controller =
            QuizController::spawn(&settings, player.clone(), resolver.clone(), music.clone());
        let events = controller.subscribe();

        Self {
            controller,
            player,
            resolver,
            music,
            events,
        }
    }

    /// Events published since the last drain.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Finish the current clip and let the next one start.
    pub async fn finish_current(&self) {
        assert!(self.player.complete_current(), "nothing was playing");
        settle().await;
    }

    /// Start the two-question session and play through to the first answer window.
    pub async fn start_and_reach_first_question(&self) {
        self.controller.start(two_question_config()).await.unwrap();
        settle().await;
        self.finish_current().await; // host intro
        self.finish_current().await; // session intro
        self.finish_current().await; // question 1
    }
}

pub fn test_settings() -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.playback.variant_seed = Some(7);
    settings
}

/// Give the runtime time to settle (longer than the settle delay).
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

pub fn started_tags(events: &[SessionEvent]) -> Vec<ActionTag> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::ActionStarted { tag, .. } => Some(*tag),
            _ => None,
        })
        .collect()
}

fn one(script: &str, audio: &str) -> PhraseSet {
    PhraseSet::new(vec![Phrase::new(script, audio)])
}

/// Two questions: Q1 answer "A", Q2 answer "B". Every phrase has audio.
pub fn two_question_config() -> SessionConfig {
    SessionConfig {
        quiz_id: "capitals".to_string(),
        title: "Capitals".to_string(),
        narrator: "ava".to_string(),
        questions: vec![
            Question::new("q1", "Capital of France?", [("A", true), ("B", false)])
                .with_prompt_audio("q1.mp3")
                .with_correction_audio("q1_correction.mp3")
                .with_repeat_audio("q1_repeat.mp3"),
            Question::new("q2", "Capital of Spain?", [("A", false), ("B", true)])
                .with_prompt_audio("https://cdn.test/q2.mp3")
                .with_correction_audio("q2_correction.mp3"),
        ],
        assets: AudioAssets {
            host: HostPhrases {
                intro: one("Hello and welcome.", "host_intro.mp3"),
                prepare_review: one("That was the last one.", "prepare_review.mp3"),
                sponsor: one("Brought to you by tea.", "sponsor.mp3"),
                review: one("Here's how you did.", "review.mp3"),
                outro: one("See you next time.", "outro.mp3"),
            },
            session_intro: one("Today: capitals.", "session_intro.mp3"),
            feedback: FeedbackPhrases {
                correct: one("Correct!", "correct.mp3"),
                incorrect: one("Not quite.", "wrong.mp3"),
                no_response: one("Out of time.", "no_response.mp3"),
            },
            control: ControlPhrases {
                skipped: one("Skipping.", "skipped.mp3"),
                repeat: one("Once more.", "repeat.mp3"),
            },
            alerts: PhraseSet::default(),
            background_music: vec!["ambience.mp3".into()],
        },
    }
}
