//! Configuration for a conversational session
//!
//! Provides centralized configuration for the turn store and both speech
//! controllers, loadable from TOML.

use crate::speech::capture::CaptureConfig;
use crate::speech::playback::PlaybackConfig;
use crate::turns::DEFAULT_TEMP_PREFIX;
use crate::{ChatterError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Configuration for a session
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix of client-generated ids for optimistic turns
    pub temp_id_prefix: String,

    /// Speech recognition settings
    pub capture: CaptureConfig,

    /// Spoken response settings
    pub playback: PlaybackConfig,

    /// Whether to attach the platform recognizer
    pub enable_voice_input: bool,

    /// Whether to attach the platform synthesizer
    pub enable_voice_output: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            temp_id_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            capture: CaptureConfig::default(),
            playback: PlaybackConfig::default(),
            enable_voice_input: true,
            enable_voice_output: true,
        }
    }
}

impl SessionConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ChatterError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the playback configuration
    pub fn with_playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    /// Set the capture configuration
    pub fn with_capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// Disable voice input (typed messages only)
    pub fn without_voice_input(mut self) -> Self {
        self.enable_voice_input = false;
        self
    }

    /// Disable voice output (text-only responses)
    pub fn without_voice_output(mut self) -> Self {
        self.enable_voice_output = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.temp_id_prefix.is_empty() {
            return Err(ChatterError::Config(
                "temp_id_prefix must not be empty".to_string(),
            ));
        }

        if self.capture.language.trim().is_empty() {
            return Err(ChatterError::Config(
                "capture.language must not be empty".to_string(),
            ));
        }

        let playback = &self.playback;
        if !(playback.rate > 0.0 && playback.rate <= 10.0) {
            return Err(ChatterError::Config(format!(
                "playback.rate must be in (0, 10], got {}",
                playback.rate
            )));
        }
        if !(0.0..=2.0).contains(&playback.pitch) {
            return Err(ChatterError::Config(format!(
                "playback.pitch must be in [0, 2], got {}",
                playback.pitch
            )));
        }
        if !(0.0..=1.0).contains(&playback.volume) {
            return Err(ChatterError::Config(format!(
                "playback.volume must be in [0, 1], got {}",
                playback.volume
            )));
        }

        Ok(())
    }
}
