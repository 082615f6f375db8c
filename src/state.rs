use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use crate::{
    assemble::{FfmpegEncoder, FfmpegTagWriter},
    dict::Dictionary,
    pipeline::Collaborators,
    settings::Settings,
    synth::{PiperLauncher, VoiceLibrary},
    util::runtime::{path_from_env, runtime_dir},
};

/// Filesystem locations, resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub runtime_dir: PathBuf,
    pub voices_dir: PathBuf,
    pub dictionary_path: PathBuf,
    pub log_dir: PathBuf,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let runtime_dir = runtime_dir();
        Self {
            voices_dir: path_from_env("NARRATOR_VOICES_DIR", runtime_dir.join("voices")),
            dictionary_path: path_from_env(
                "NARRATOR_DICTIONARY",
                runtime_dir.join("dictionary.json"),
            ),
            log_dir: path_from_env("NARRATOR_LOG_DIR", PathBuf::from("logs")),
            runtime_dir,
        }
    }
}

/// Long-lived resources shared by the CLI commands.
pub struct AppState {
    pub config: RuntimeConfig,
    pub dictionary: Dictionary,
    pub voices: Arc<VoiceLibrary>,
}

impl AppState {
    pub fn initialise(config: RuntimeConfig) -> Result<Self> {
        let dictionary = Dictionary::load_or_default(config.dictionary_path.clone())
            .context("failed to load pronunciation dictionary")?;
        let voices = Arc::new(VoiceLibrary::new(config.voices_dir.clone()));
        Ok(Self {
            config,
            dictionary,
            voices,
        })
    }

    /// `settings` with the dictionary merged beneath its own corrections.
    pub fn effective_settings(&self, mut settings: Settings) -> Settings {
        settings.pronunciation_corrections = self
            .dictionary
            .merged_with(&settings.pronunciation_corrections);
        settings
    }

    /// Piper for synthesis and ffmpeg for encoding and tagging.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            launcher: Box::new(PiperLauncher::new(
                self.config.runtime_dir.clone(),
                self.voices.clone(),
            )),
            encoder: Box::new(FfmpegEncoder::locate()),
            tagger: Some(Box::new(FfmpegTagWriter::locate())),
        }
    }
}
