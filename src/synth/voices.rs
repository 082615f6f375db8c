use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice '{0}' not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub label: String,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub sample_rate: Option<u32>,
    pub model_path: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl VoiceInfo {
    /// Whether the voice reads `language`, compared on the primary subtag:
    /// "en" matches "en_US" and "en-GB". Voices without metadata match
    /// every language.
    pub fn speaks(&self, language: &str) -> bool {
        let Some(code) = self.language.as_deref() else {
            return true;
        };
        primary_subtag(code).eq_ignore_ascii_case(primary_subtag(language))
    }
}

fn primary_subtag(code: &str) -> &str {
    code.split(['_', '-']).next().unwrap_or(code).trim()
}

/// Voice models installed under a base directory, keyed by file stem.
#[derive(Default)]
pub struct VoiceLibrary {
    base_dir: PathBuf,
    voices: RwLock<HashMap<String, VoiceInfo>>,
}

impl VoiceLibrary {
    pub fn new(base_dir: PathBuf) -> Self {
        let library = Self {
            base_dir,
            voices: RwLock::new(HashMap::new()),
        };
        library.refresh();
        library
    }

    /// Rescans the base directory for `*.onnx` models. A missing directory
    /// leaves the library empty.
    pub fn refresh(&self) {
        let discovered: HashMap<_, _> = WalkDir::new(&self.base_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "onnx"))
            .filter_map(|entry| build_voice_info(entry.path()))
            .map(|info| (info.id.clone(), info))
            .collect();
        *self.voices.write() = discovered;
    }

    pub fn list(&self) -> Vec<VoiceInfo> {
        let mut voices: Vec<_> = self.voices.read().values().cloned().collect();
        voices.sort_by(|a, b| a.label.cmp(&b.label));
        voices
    }

    /// Installed voices able to read `language`, in label order.
    pub fn for_language(&self, language: &str) -> Vec<VoiceInfo> {
        self.list()
            .into_iter()
            .filter(|voice| voice.speaks(language))
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<VoiceInfo, VoiceError> {
        self.voices
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| VoiceError::NotFound(id.to_string()))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// The subset of Piper's `<model>.onnx.json` that discovery cares about.
#[derive(Debug, Default, Deserialize)]
struct VoiceConfig {
    #[serde(default)]
    language: Option<LanguageSection>,
    #[serde(default)]
    audio: Option<AudioSection>,
}

#[derive(Debug, Deserialize)]
struct LanguageSection {
    code: Option<String>,
    name_english: Option<String>,
    name_native: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AudioSection {
    quality: Option<String>,
    sample_rate: Option<u32>,
}

fn read_config(path: &Path) -> Option<VoiceConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| warn!("Failed to read voice config {}: {err}", path.display()))
        .ok()?;
    serde_json::from_str(&contents)
        .map_err(|err| warn!("Failed to parse voice config {}: {err}", path.display()))
        .ok()
}

fn build_voice_info(model_path: &Path) -> Option<VoiceInfo> {
    let id = model_path.file_stem()?.to_string_lossy().to_string();
    let config_path = config_path_for(model_path);
    let config = config_path
        .as_deref()
        .and_then(read_config)
        .unwrap_or_default();

    let (language, language_name) = match config.language {
        Some(section) => (
            section.code,
            section.name_english.or(section.name_native),
        ),
        None => (None, None),
    };
    let label = match language_name {
        Some(name) => format!("{name} · {id}"),
        None => id.clone(),
    };
    let (quality, sample_rate) = config
        .audio
        .map(|audio| (audio.quality, audio.sample_rate))
        .unwrap_or_default();

    Some(VoiceInfo {
        id,
        label,
        language,
        quality,
        sample_rate,
        model_path: model_path.to_path_buf(),
        config_path,
    })
}

fn config_path_for(model_path: &Path) -> Option<PathBuf> {
    let mut config_path = model_path.to_path_buf();
    config_path.set_extension("onnx.json");
    config_path.exists().then_some(config_path)
}
