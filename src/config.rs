//! Configuration loader for strangewave.
//!
//! * Looks for `strangewave.toml` in the cwd unless overridden by `--config`.
//! * Every field has a default so the file is optional.
//!
//! ```toml
//! [audio]
//! backend = "device"
//! master_volume = 0.7
//!
//! [audio.mixers]
//! ambient = 0.5
//! ```

use serde::Deserialize;
use std::fs;

use crate::audio::AudioConfig;

/// Default config file name, resolved against the cwd.
pub const DEFAULT_CONFIG_PATH: &str = "strangewave.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the mixing graph renders to.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackend {
    /// Default output device through rodio/cpal.
    #[default]
    Device,
    /// No device; frames are pulled with `SoundService::render_offline`.
    Offline,
    /// Behave like a platform without audio support.
    Disabled,
}

impl AudioBackend {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "device" | "output" => AudioBackend::Device,
            "offline" | "headless" => AudioBackend::Offline,
            "disabled" | "none" | "off" => AudioBackend::Disabled,
            _ => AudioBackend::Device,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioBackend::Device => "device",
            AudioBackend::Offline => "offline",
            AudioBackend::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
}

impl Config {
    /// Load from a TOML file; fall back to defaults on any error.
    pub fn load(path: Option<&str>) -> Self {
        let p = path.unwrap_or(DEFAULT_CONFIG_PATH);
        match Self::try_load(p) {
            Ok(config) => {
                log::info!("loaded config from {p}");
                config
            }
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {p}, using defaults");
                Self::default()
            }
            Err(err) => {
                log::warn!("{p}: {err}; using defaults");
                Self::default()
            }
        }
    }

    pub fn try_load(path: &str) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.audio.backend, AudioBackend::Device);
        assert!((config.audio.master_volume - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.audio.sample_rate, 44_100);
    }

    #[test]
    fn partial_audio_table_keeps_other_defaults() {
        let config = Config::from_toml_str(
            "[audio]\nbackend = \"offline\"\nfade_ms = 5\n\n[audio.mixers]\nambient = 0.25\n",
        )
        .unwrap();
        assert_eq!(config.audio.backend, AudioBackend::Offline);
        assert_eq!(config.audio.fade_ms, 5);
        assert!((config.audio.mixers.ambient - 0.25).abs() < f32::EPSILON);
        assert!((config.audio.mixers.core - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = Config::from_toml_str("[audio\nbackend=").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_falls_back() {
        let config = Config::load(Some("/nonexistent/strangewave.toml"));
        assert_eq!(config.audio.backend, AudioBackend::Device);
    }

    #[test]
    fn backend_from_string() {
        assert_eq!(AudioBackend::from_string("Offline"), AudioBackend::Offline);
        assert_eq!(AudioBackend::from_string("none"), AudioBackend::Disabled);
        assert_eq!(AudioBackend::from_string("whatever"), AudioBackend::Device);
    }
}
