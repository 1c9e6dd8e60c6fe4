//! Quiz controller: the imperative API the UI talks to.
//!
//! Every call becomes one command on the runtime's input channel and waits
//! for the runtime's reply. The controller itself makes no sequencing
//! decisions.

use super::context::AnswerResult;
use super::events::{EventHub, SessionEvent, SessionSnapshot};
use super::runtime::{Command, Input, Reply, SessionRuntime};
use super::SessionError;
use crate::audio::{
    DefaultResolver, MusicOutput, ResourceResolver, RodioMusicOutput, RodioSegmentPlayer,
    SegmentPlayer,
};
use crate::quiz::SessionConfig;
use crate::storage::config::EngineSettings;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Handle to a running quiz session engine.
///
/// Dropping the controller shuts the engine down.
pub struct QuizController {
    inputs: mpsc::UnboundedSender<Input>,
    events: broadcast::Sender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl QuizController {
    /// Spawn the session runtime on the current tokio runtime.
    pub fn spawn<P, R, O>(
        settings: &EngineSettings,
        player: P,
        resolver: R,
        music_output: O,
    ) -> Self
    where
        P: SegmentPlayer,
        R: ResourceResolver,
        O: MusicOutput,
    {
        let (inputs, receiver) = mpsc::unbounded_channel();
        let hub = EventHub::default();
        let events = hub.sender();
        let snapshot = hub.watch();

        let runtime = SessionRuntime::new(
            settings,
            player,
            resolver,
            music_output,
            hub,
            inputs.clone(),
        );
        let task = tokio::spawn(runtime.run(receiver));

        Self {
            inputs,
            events,
            snapshot,
            task: Some(task),
        }
    }

    /// Spawn with rodio playback and the default resolver.
    pub fn with_default_devices(settings: &EngineSettings) -> Result<Self, SessionError> {
        let resolver =
            DefaultResolver::new(settings.bundle_dir(), settings.playback.http_timeout())?;
        let player = RodioSegmentPlayer::new(settings.playback.narration_volume);

        Ok(Self::spawn(
            settings,
            player,
            resolver,
            RodioMusicOutput::new(),
        ))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.inputs
            .send(Input::Command(command(reply)))
            .map_err(|_| SessionError::RuntimeUnavailable)?;
        response.await.map_err(|_| SessionError::RuntimeUnavailable)?
    }

    /// Start a session; fails if the config is invalid or a session is running.
    pub async fn start(&self, config: SessionConfig) -> Result<Uuid, SessionError> {
        self.request(|reply| Command::Start { config, reply }).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Answer the question currently awaiting a response.
    pub async fn select_answer(&self, label: &str) -> Result<AnswerResult, SessionError> {
        let label = label.to_string();
        self.request(|reply| Command::SelectAnswer { label, reply })
            .await
    }

    pub async fn skip_question(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Skip { reply }).await
    }

    /// Replay the current question while the answer window is open.
    pub async fn repeat_question(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Repeat { reply }).await
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Latest session snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every snapshot change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the runtime and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.inputs.send(Input::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Session runtime ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for QuizController {
    fn drop(&mut self) {
        let _ = self.inputs.send(Input::Shutdown);
    }
}
