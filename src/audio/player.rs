//! Foreground Segment Player
//!
//! Plays one narration clip at a time using rodio and reports completion
//! through a oneshot channel.

use super::{AudioClip, AudioError, PlaybackOutcome};
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// How often the playback thread checks for control messages and the end of the clip.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Trait for foreground narration players.
///
/// Only one clip may be alive at a time: `play` must tear down whatever was
/// playing before. The outcome is sent on `done` when the clip ends; a clip
/// torn down by `stop` or a subsequent `play` drops `done` without sending.
pub trait SegmentPlayer: Send + 'static {
    /// Start playing a clip.
    fn play(
        &mut self,
        clip: AudioClip,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<(), AudioError>;

    /// Pause the current clip, if any.
    fn pause(&mut self);

    /// Resume a paused clip.
    fn resume(&mut self);

    /// Tear down the current clip immediately.
    fn stop(&mut self);

    /// Check if a clip is currently audible.
    fn is_playing(&self) -> bool;
}

enum PlaybackControl {
    Pause,
    Resume,
    Stop,
}

struct ActivePlayback {
    control: mpsc::Sender<PlaybackControl>,
    running: Arc<AtomicBool>,
    paused: bool,
}

/// Rodio-backed segment player.
///
/// Each clip gets its own output stream and sink on a dedicated thread,
/// since rodio's output stream cannot move between threads. Control calls
/// only message that thread and never wait on it, so they are safe to make
/// from async code.
pub struct RodioSegmentPlayer {
    volume: f32,
    current: Option<ActivePlayback>,
}

impl RodioSegmentPlayer {
    /// Create a player with the given narration volume (0.0 - 1.0).
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            current: None,
        }
    }

    /// Set the volume used for subsequent clips.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl Default for RodioSegmentPlayer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SegmentPlayer for RodioSegmentPlayer {
    fn play(
        &mut self,
        clip: AudioClip,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<(), AudioError> {
        self.stop();

        let (control_tx, control_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);
        let volume = self.volume;
        let source = clip.source().to_string();

        std::thread::Builder::new()
            .name("narration-playback".to_string())
            .spawn(move || {
                let outcome = run_clip(clip, volume, control_rx);
                running_flag.store(false, Ordering::SeqCst);
                if let Some(outcome) = outcome {
                    let _ = done.send(outcome);
                }
            })
            .map_err(|e| AudioError::PlaybackFailed(e.to_string()))?;

        tracing::debug!("Playing narration clip {}", source);

        self.current = Some(ActivePlayback {
            control: control_tx,
            running,
            paused: false,
        });

        Ok(())
    }

    fn pause(&mut self) {
        if let Some(active) = self.current.as_mut() {
            let _ = active.control.send(PlaybackControl::Pause);
            active.paused = true;
        }
    }

    fn resume(&mut self) {
        if let Some(active) = self.current.as_mut() {
            let _ = active.control.send(PlaybackControl::Resume);
            active.paused = false;
        }
    }

    /// The old thread drops its sink within one poll interval.
    fn stop(&mut self) {
        if let Some(active) = self.current.take() {
            let _ = active.control.send(PlaybackControl::Stop);
        }
    }

    fn is_playing(&self) -> bool {
        self.current
            .as_ref()
            .map(|a| !a.paused && a.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl Drop for RodioSegmentPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Play one clip to completion on the current thread.
///
/// Returns `None` when the clip was stopped from outside.
fn run_clip(
    clip: AudioClip,
    volume: f32,
    control: mpsc::Receiver<PlaybackControl>,
) -> Option<PlaybackOutcome> {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            return Some(PlaybackOutcome::Failed(AudioError::DeviceNotAvailable(
                e.to_string(),
            )))
        }
    };

    let sink = match Sink::try_new(&stream_handle) {
        Ok(sink) => sink,
        Err(e) => return Some(PlaybackOutcome::Failed(AudioError::PlaybackFailed(e.to_string()))),
    };

    let decoder = match Decoder::new(Cursor::new(clip.bytes())) {
        Ok(decoder) => decoder,
        Err(e) => {
            return Some(PlaybackOutcome::Failed(AudioError::Decode(format!(
                "{}: {}",
                clip.source(),
                e
            ))))
        }
    };

    sink.set_volume(volume);
    sink.append(decoder);

    loop {
        match control.recv_timeout(POLL_INTERVAL) {
            Ok(PlaybackControl::Pause) => sink.pause(),
            Ok(PlaybackControl::Resume) => sink.play(),
            Ok(PlaybackControl::Stop) | Err(RecvTimeoutError::Disconnected) => {
                sink.stop();
                return None;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        if sink.empty() {
            return Some(PlaybackOutcome::Finished);
        }
    }
}
