//! TOML configuration for the dashboard binary.
//!
//! Every field has a default, so a missing file is not an error; CLI flags
//! override whatever the file provides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DeskError;

/// Operator-facing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Session backend base URL.
    pub server_url: String,
    /// Push channel WebSocket URL.
    pub channel_url: String,
    /// Playback volume slider, 0–100.
    pub volume: u8,
    /// Initial comment filter: all, answered, or unanswered.
    pub filter: String,
    /// Cap on rendered blocks before the oldest is evicted.
    pub max_blocks: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        DeskConfig {
            server_url: "http://127.0.0.1:5000".to_string(),
            channel_url: "ws://127.0.0.1:5000/push".to_string(),
            volume: 80,
            filter: "all".to_string(),
            max_blocks: 200,
        }
    }
}

impl DeskConfig {
    /// Load from `path`, or defaults when `path` is `None` or doesn't exist.
    /// A file that exists but fails to parse is an error — a silently ignored
    /// typo in a config file is worse than a refusal to start.
    pub fn load(path: Option<&Path>) -> Result<Self, DeskError> {
        let Some(path) = path else {
            return Ok(DeskConfig::default());
        };
        if !path.exists() {
            return Ok(DeskConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| DeskError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| DeskError::Config(format!("{}: {}", path.display(), e)))
    }
}
