//! Background Music Loop
//!
//! Loops one ambience track underneath the narration and drives its volume
//! envelope. The envelope runs on a tokio task so the whole schedule can be
//! cancelled with a single abort.

use super::{AudioClip, AudioError, AudioRef, ResourceResolver, VolumeEnvelope};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Callback for music failures the session should hear about.
pub type MusicFailureHook = Arc<dyn Fn(AudioError) + Send + Sync>;

/// Output device for the looping track.
///
/// `start` may block while the device comes up; callers run it on the
/// blocking pool. `stop` and `set_volume` must return without waiting.
pub trait MusicOutput: Send + Sync + 'static {
    /// Start looping a clip, replacing anything already looping.
    fn start(&self, clip: AudioClip, volume: f32) -> Result<(), AudioError>;

    /// Change the loop volume (0.0 - 1.0).
    fn set_volume(&self, volume: f32);

    /// Stop the loop.
    fn stop(&self);

    /// Check if a track is looping.
    fn is_playing(&self) -> bool;
}

enum LoopControl {
    Volume(f32),
    Stop,
}

struct LoopPlayback {
    control: mpsc::Sender<LoopControl>,
    running: Arc<AtomicBool>,
}

/// Rodio-backed looping output.
#[derive(Default)]
pub struct RodioMusicOutput {
    current: Mutex<Option<LoopPlayback>>,
}

impl RodioMusicOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MusicOutput for RodioMusicOutput {
    fn start(&self, clip: AudioClip, volume: f32) -> Result<(), AudioError> {
        self.stop();

        let (control_tx, control_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);

        std::thread::Builder::new()
            .name("music-loop".to_string())
            .spawn(move || {
                run_loop(clip, volume, control_rx, ready_tx);
                running_flag.store(false, Ordering::SeqCst);
            })
            .map_err(|e| AudioError::PlaybackFailed(e.to_string()))?;

        // The thread reports once the device and decoder are up
        ready_rx
            .recv()
            .unwrap_or_else(|_| Err(AudioError::PlaybackFailed("music thread exited".into())))?;

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(LoopPlayback {
            control: control_tx,
            running,
        });
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(playback) = current.as_ref() {
            let _ = playback.control.send(LoopControl::Volume(volume.clamp(0.0, 1.0)));
        }
    }

    /// Signal the loop thread; it releases the device on its next poll.
    fn stop(&self) {
        let playback = self.current.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(playback) = playback {
            let _ = playback.control.send(LoopControl::Stop);
        }
    }

    fn is_playing(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|p| p.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl Drop for RodioMusicOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    clip: AudioClip,
    volume: f32,
    control: mpsc::Receiver<LoopControl>,
    ready: mpsc::Sender<Result<(), AudioError>>,
) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(AudioError::DeviceNotAvailable(e.to_string())));
            return;
        }
    };

    let sink = match Sink::try_new(&stream_handle) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = ready.send(Err(AudioError::PlaybackFailed(e.to_string())));
            return;
        }
    };

    let decoder = match Decoder::new_looped(Cursor::new(clip.bytes())) {
        Ok(decoder) => decoder,
        Err(e) => {
            let _ = ready.send(Err(AudioError::Decode(format!("{}: {}", clip.source(), e))));
            return;
        }
    };

    sink.set_volume(volume);
    sink.append(decoder);
    let _ = ready.send(Ok(()));

    loop {
        match control.recv_timeout(POLL_INTERVAL) {
            Ok(LoopControl::Volume(v)) => sink.set_volume(v),
            Ok(LoopControl::Stop) | Err(RecvTimeoutError::Disconnected) => {
                sink.stop();
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Looping ambience with a duck-then-fade volume envelope.
pub struct BackgroundMusicLoop<O: MusicOutput, R: ResourceResolver> {
    output: Arc<O>,
    resolver: Arc<R>,
    envelope: VolumeEnvelope,
    enabled: bool,
    rng: StdRng,
    volume: Arc<Mutex<f32>>,
    /// Bumped by every `stop`; a start that finishes under an older value is undone
    generation: Arc<AtomicU64>,
    /// Device starts run one at a time so undoing a stale start cannot hit a newer one
    start_lock: Arc<Mutex<()>>,
    task: Option<JoinHandle<()>>,
    current: Option<AudioRef>,
    on_failure: Option<MusicFailureHook>,
}

impl<O: MusicOutput, R: ResourceResolver> BackgroundMusicLoop<O, R> {
    /// Create a loop with the default envelope.
    pub fn new(output: Arc<O>, resolver: Arc<R>) -> Self {
        Self {
            output,
            resolver,
            envelope: VolumeEnvelope::default(),
            enabled: true,
            rng: StdRng::from_entropy(),
            volume: Arc::new(Mutex::new(0.0)),
            generation: Arc::new(AtomicU64::new(0)),
            start_lock: Arc::new(Mutex::new(())),
            task: None,
            current: None,
            on_failure: None,
        }
    }

    pub fn with_envelope(mut self, envelope: VolumeEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Use a fixed seed for track selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Register a hook for resolution or device failures.
    pub fn set_failure_hook(&mut self, hook: Option<MusicFailureHook>) {
        self.on_failure = hook;
    }

    /// Start looping one of `candidates`, chosen at random.
    ///
    /// Returns the chosen track, or `None` when nothing will play.
    pub fn start(&mut self, candidates: &[AudioRef]) -> Option<AudioRef> {
        self.stop();

        if !self.enabled {
            tracing::debug!("Background music disabled");
            return None;
        }

        let track = match candidates.choose(&mut self.rng) {
            Some(track) => track.clone(),
            None => {
                tracing::debug!("No background music candidates configured");
                return None;
            }
        };

        tracing::info!("Starting background music {}", track);

        let output = Arc::clone(&self.output);
        let resolver = Arc::clone(&self.resolver);
        let envelope = self.envelope.clone();
        let volume = Arc::clone(&self.volume);
        let on_failure = self.on_failure.clone();
        let source = track.clone();
        let generation = Arc::clone(&self.generation);
        let issued = generation.load(Ordering::SeqCst);
        let start_lock = Arc::clone(&self.start_lock);

        self.task = Some(tokio::spawn(async move {
            let started = match resolver.resolve(&source).await {
                Ok(clip) => {
                    let guard = StartGuard {
                        generation,
                        issued,
                        lock: start_lock,
                    };
                    start_output(Arc::clone(&output), clip, envelope.full_volume, guard).await
                }
                Err(e) => Err(e),
            };

            match started {
                Ok(true) => {
                    set_shared(&volume, envelope.full_volume);
                    run_envelope(output, envelope, volume).await;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Background music unavailable: {}", e);
                    if let Some(hook) = on_failure {
                        hook(e);
                    }
                }
            }
        }));

        self.current = Some(track.clone());
        Some(track)
    }

    /// Cancel every pending volume step and stop the output.
    ///
    /// A device start still in progress is undone as soon as it returns.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.current.take().is_some() {
            tracing::debug!("Stopping background music");
        }
        self.output.stop();
        set_shared(&self.volume, 0.0);
    }

    /// Current envelope volume.
    pub fn volume(&self) -> f32 {
        shared(&self.volume)
    }

    /// Track chosen by the last `start`.
    pub fn current_track(&self) -> Option<&AudioRef> {
        self.current.as_ref()
    }

    pub fn envelope(&self) -> &VolumeEnvelope {
        &self.envelope
    }
}

impl<O: MusicOutput, R: ResourceResolver> Drop for BackgroundMusicLoop<O, R> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Generation snapshot taken when a start was issued.
struct StartGuard {
    generation: Arc<AtomicU64>,
    issued: u64,
    lock: Arc<Mutex<()>>,
}

impl StartGuard {
    fn is_stale(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.issued
    }
}

/// Open the output on the blocking pool.
///
/// Returns `false` when the loop was stopped while the device came up; the
/// output is stopped again on the blocking thread itself, so this holds even
/// when the awaiting task has been aborted.
async fn start_output<O: MusicOutput>(
    output: Arc<O>,
    clip: AudioClip,
    volume: f32,
    guard: StartGuard,
) -> Result<bool, AudioError> {
    tokio::task::spawn_blocking(move || {
        let _serial = guard.lock.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_stale() {
            return Ok(false);
        }

        output.start(clip, volume)?;
        if guard.is_stale() {
            tracing::debug!("Background music stopped while starting");
            output.stop();
            return Ok(false);
        }
        Ok(true)
    })
    .await
    .map_err(|e| AudioError::PlaybackFailed(e.to_string()))?
}

fn shared(volume: &Mutex<f32>) -> f32 {
    *volume.lock().unwrap_or_else(|e| e.into_inner())
}

fn set_shared(volume: &Mutex<f32>, value: f32) {
    *volume.lock().unwrap_or_else(|e| e.into_inner()) = value;
}

/// Lower the volume to `target`; the envelope never raises it.
fn lower_to<O: MusicOutput>(output: &O, volume: &Mutex<f32>, target: f32) -> f32 {
    let mut current = volume.lock().unwrap_or_else(|e| e.into_inner());
    if target < *current {
        *current = target;
        output.set_volume(target);
    }
    *current
}

async fn run_envelope<O: MusicOutput>(
    output: Arc<O>,
    envelope: VolumeEnvelope,
    volume: Arc<Mutex<f32>>,
) {
    let origin = Instant::now();

    let duck = async {
        for step in envelope.duck_schedule() {
            tokio::time::sleep_until(origin + step.at).await;
            lower_to(output.as_ref(), &volume, step.volume);
        }
    };

    let fade = async {
        tokio::time::sleep_until(origin + envelope.fade_out_delay).await;
        let from = shared(&volume);
        let fade_origin = Instant::now();
        tracing::debug!("Fading background music from {:.2}", from);

        for step in envelope.fade_schedule(from) {
            tokio::time::sleep_until(fade_origin + step.at).await;
            if lower_to(output.as_ref(), &volume, step.volume) <= 0.0 {
                break;
            }
        }

        output.stop();
        tracing::debug!("Background music faded out");
    };

    tokio::join!(duck, fade);
}
