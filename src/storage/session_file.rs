//! Session configuration files (JSON).

use super::config::ConfigError;
use crate::quiz::SessionConfig;
use std::path::Path;

/// Load a session configuration from a JSON file.
///
/// Only parses; question-set validation happens when the session starts.
pub fn load_session_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let config: SessionConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    tracing::debug!(
        "Loaded session config {} with {} questions",
        path.display(),
        config.questions.len()
    );
    Ok(config)
}

/// Write a session configuration as pretty-printed JSON.
pub fn save_session_config(config: &SessionConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
}
