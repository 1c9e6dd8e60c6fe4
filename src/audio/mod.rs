//! Audio Playback Module
//!
//! Foreground narration playback, background music with a volume envelope,
//! and resolution of audio references into playable clips.

pub mod envelope;
pub mod music;
pub mod player;
pub mod resolver;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// Re-export main types
pub use envelope::{VolumeEnvelope, VolumeStep};
pub use music::{BackgroundMusicLoop, MusicFailureHook, MusicOutput, RodioMusicOutput};
pub use player::{RodioSegmentPlayer, SegmentPlayer};
pub use resolver::{DefaultResolver, ResourceResolver};

/// Errors that can occur during audio operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("Audio device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("Audio resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Network failure fetching {resource}: {reason}")]
    NetworkFailure { resource: String, reason: String },

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

impl AudioError {
    /// Whether the session can carry on without this piece of audio.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AudioError::DeviceNotAvailable(_))
    }
}

/// Reference to a piece of audio, either bundled with the app or remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AudioRef {
    /// Remote URL (http or https)
    Remote(String),
    /// Bundled resource name, resolved against the bundle directory
    Bundle(String),
}

impl AudioRef {
    /// Classify a raw reference string.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            AudioRef::Remote(trimmed.to_string())
        } else {
            AudioRef::Bundle(trimmed.to_string())
        }
    }

    /// The raw reference string.
    pub fn as_str(&self) -> &str {
        match self {
            AudioRef::Remote(url) => url,
            AudioRef::Bundle(name) => name,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, AudioRef::Remote(_))
    }
}

impl From<String> for AudioRef {
    fn from(raw: String) -> Self {
        AudioRef::parse(&raw)
    }
}

impl From<&str> for AudioRef {
    fn from(raw: &str) -> Self {
        AudioRef::parse(raw)
    }
}

impl From<AudioRef> for String {
    fn from(reference: AudioRef) -> Self {
        match reference {
            AudioRef::Remote(url) => url,
            AudioRef::Bundle(name) => name,
        }
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encoded audio ready to hand to a player.
///
/// The bytes are shared, so cloning a clip is cheap.
#[derive(Clone)]
pub struct AudioClip {
    source: AudioRef,
    bytes: Arc<[u8]>,
}

impl AudioClip {
    /// Create a clip from encoded bytes.
    pub fn new(source: AudioRef, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source,
            bytes: bytes.into(),
        }
    }

    /// Where the clip came from.
    pub fn source(&self) -> &AudioRef {
        &self.source
    }

    /// Shared handle to the encoded bytes.
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("source", &self.source)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// How a single foreground playback ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackOutcome {
    /// Played to the end
    Finished,
    /// Nothing to play (action without audio)
    Skipped,
    /// Could not be resolved, decoded or played
    Failed(AudioError),
    /// Torn down before reaching the end
    Interrupted,
}
