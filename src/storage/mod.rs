//! Storage module for engine settings and session configuration files.

pub mod config;
pub mod session_file;

pub use config::{
    load_config, load_config_from, save_config, save_config_to, ConfigError, EngineSettings,
    MusicSettings, PlaybackSettings,
};
pub use session_file::{load_session_config, save_session_config};
