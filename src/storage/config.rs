//! Engine configuration.
//!
//! Settings are stored as TOML in the platform data directory. A missing
//! file yields the defaults.

use crate::audio::VolumeEnvelope;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Narration playback settings
    pub playback: PlaybackSettings,
    /// Background music settings
    pub music: MusicSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            playback: PlaybackSettings::default(),
            music: MusicSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Directory bundled audio names resolve against.
    pub fn bundle_dir(&self) -> PathBuf {
        self.playback
            .bundle_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("audio"))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);

        if !in_unit(self.playback.narration_volume) {
            return Err(ConfigError::InvalidValue(
                "playback.narration_volume must be between 0 and 1".to_string(),
            ));
        }
        if !in_unit(self.music.full_volume) || !in_unit(self.music.sustain_volume) {
            return Err(ConfigError::InvalidValue(
                "music volumes must be between 0 and 1".to_string(),
            ));
        }
        if self.music.sustain_volume > self.music.full_volume {
            return Err(ConfigError::InvalidValue(
                "music.sustain_volume cannot exceed music.full_volume".to_string(),
            ));
        }
        if self.music.fade_out_steps == 0 {
            return Err(ConfigError::InvalidValue(
                "music.fade_out_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Narration playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Pause between one action completing and the next starting
    pub settle_delay_ms: u64,
    /// Answer window in seconds; 0 waits forever
    pub response_window_secs: u64,
    /// Narration volume (0.0 - 1.0)
    pub narration_volume: f32,
    /// Bundled audio directory; defaults to `<data_dir>/audio`
    pub bundle_dir: Option<PathBuf>,
    /// Timeout for remote audio fetches
    pub http_timeout_secs: u64,
    /// Fixed seed for phrase and track selection
    pub variant_seed: Option<u64>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 500,
            response_window_secs: 15,
            narration_volume: 1.0,
            bundle_dir: None,
            http_timeout_secs: 15,
            variant_seed: None,
        }
    }
}

impl PlaybackSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Answer window, `None` when disabled.
    pub fn response_window(&self) -> Option<Duration> {
        match self.response_window_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Background music settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    /// Play background music at all
    pub enabled: bool,
    pub full_volume: f32,
    pub sustain_volume: f32,
    /// Time at full volume before ducking
    pub sustain_delay_ms: u64,
    pub sustain_ramp_ms: u64,
    pub sustain_ramp_steps: u32,
    /// Time from start until the fade-out begins
    pub fade_out_delay_ms: u64,
    pub fade_out_secs: u64,
    pub fade_out_steps: u32,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            full_volume: 1.0,
            sustain_volume: 0.3,
            sustain_delay_ms: 5000,
            sustain_ramp_ms: 1000,
            sustain_ramp_steps: 10,
            fade_out_delay_ms: 6000,
            fade_out_secs: 55,
            fade_out_steps: 110,
        }
    }
}

impl MusicSettings {
    /// Volume envelope described by these settings.
    pub fn envelope(&self) -> VolumeEnvelope {
        VolumeEnvelope {
            full_volume: self.full_volume,
            sustain_volume: self.sustain_volume,
            sustain_delay: Duration::from_millis(self.sustain_delay_ms),
            sustain_ramp: Duration::from_millis(self.sustain_ramp_ms),
            sustain_ramp_steps: self.sustain_ramp_steps,
            fade_out_delay: Duration::from_millis(self.fade_out_delay_ms),
            fade_out: Duration::from_secs(self.fade_out_secs),
            fade_out_steps: self.fade_out_steps,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "audioquiz", "AudioQuiz")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load engine settings from the default location.
pub fn load_config() -> Result<EngineSettings, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load engine settings from `path`, falling back to defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<EngineSettings, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(EngineSettings {
            data_dir: get_data_dir(),
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: EngineSettings =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;

    config.data_dir = get_data_dir();

    Ok(config)
}

/// Save engine settings to the default location.
pub fn save_config(config: &EngineSettings) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save engine settings to `path`.
pub fn save_config_to(config: &EngineSettings, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
