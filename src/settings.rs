use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_VOICE: &str = "en_US-lessac-medium";
pub const DEFAULT_MAX_CHARS: usize = 400;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {0}: {1}")]
    Io(std::path::PathBuf, #[source] std::io::Error),
    #[error("failed to parse settings file {0}: {1}")]
    Parse(std::path::PathBuf, #[source] serde_json::Error),
    #[error("speed must be a positive number, got {0}")]
    Speed(f32),
    #[error("{name} must be a non-negative number of seconds, got {value}")]
    Pause { name: &'static str, value: f64 },
    #[error("max_chars must be at least 1")]
    MaxChars,
}

/// Narration settings. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub voice_id: String,
    pub speed: f32,
    pub sentence_pause_seconds: f64,
    /// `0` disables phrase-wise rendering.
    pub comma_pause_seconds: f64,
    pub max_chars: usize,
    pub language: String,
    pub pronunciation_corrections: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE.to_string(),
            speed: 1.0,
            sentence_pause_seconds: 0.4,
            comma_pause_seconds: 0.15,
            max_chars: DEFAULT_MAX_CHARS,
            language: "en".to_string(),
            pronunciation_corrections: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = fs::read_to_string(path)
            .map_err(|err| SettingsError::Io(path.to_path_buf(), err))?;
        let settings: Settings = serde_json::from_str(&data)
            .map_err(|err| SettingsError::Parse(path.to_path_buf(), err))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(SettingsError::Speed(self.speed));
        }
        for (name, value) in [
            ("sentence_pause_seconds", self.sentence_pause_seconds),
            ("comma_pause_seconds", self.comma_pause_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::Pause { name, value });
            }
        }
        if self.max_chars == 0 {
            return Err(SettingsError::MaxChars);
        }
        Ok(())
    }

    pub fn comma_pause(&self) -> Option<f64> {
        (self.comma_pause_seconds > 0.0).then_some(self.comma_pause_seconds)
    }
}
