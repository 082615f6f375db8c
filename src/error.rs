use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

const ERROR_INITIALIZATION: &str = "INITIALIZATION_FAILED";
const ERROR_NO_AUDIO: &str = "NO_AUDIO";
const ERROR_ASSEMBLY: &str = "ASSEMBLY_FAILED";

/// Raw failure reported by a blocking collaborator (synthesis engine or
/// subprocess). Never leaves the pipeline: it is always wrapped into one of
/// the taxonomy errors below first.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("voice '{0}' is not installed")]
    VoiceNotFound(String),
    #[error("voice model not found at {0}")]
    ModelMissing(PathBuf),
    #[error("synthesis engine unavailable: {0}")]
    Unavailable(String),
    #[error("failed to spawn engine process: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine exited with status {status}: {stderr}")]
    Process { status: i32, stderr: String },
    #[error("engine produced unreadable audio: {0}")]
    Wav(#[from] hound::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("failed to start the synthesis engine: {0}")]
    Engine(#[source] EngineError),
    #[error("failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),
}

/// Failure of a single utterance. Recovered by the orchestrator (logged and
/// skipped), never fatal.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("engine call failed: {0}")]
    Engine(#[from] EngineError),
    #[error("engine returned no audio")]
    NoAudio,
    #[error("engine switched sample rate from {expected} Hz to {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },
    #[error("failed to write segment {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no segments to assemble")]
    NoSegments,
    #[error("segment sequence broken: expected index {expected}, found {found}")]
    SegmentOrder { expected: usize, found: usize },
    #[error("segment file missing: {0}")]
    MissingSegment(PathBuf),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),
    #[error("encoder exited with status {status}: {stderr}")]
    Encoder { status: i32, stderr: String },
}

/// Metadata is best effort: these are logged and never fail a run.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("tag writer unavailable: {0}")]
    Unavailable(String),
    #[error("tag writer exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("tag writer I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failure of a narration run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),
    #[error("no audio generated")]
    NoAudio,
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Serialisable shape of a terminal failure, carried by the `Failed` event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailureReport {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl FailureReport {
    pub fn new(code: &str, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }
}

impl From<&PipelineError> for FailureReport {
    fn from(value: &PipelineError) -> Self {
        match value {
            PipelineError::Initialization(err) => FailureReport::new(
                ERROR_INITIALIZATION,
                "Failed to initialise the narration pipeline",
                Some(err.to_string()),
            ),
            PipelineError::NoAudio => FailureReport::new(ERROR_NO_AUDIO, "No audio generated", None),
            PipelineError::Assembly(AssemblyError::Encoder { status, stderr }) => {
                FailureReport::new(
                    ERROR_ASSEMBLY,
                    format!("Encoder exited with status {status}"),
                    Some(stderr.clone()),
                )
            }
            PipelineError::Assembly(err) => FailureReport::new(
                ERROR_ASSEMBLY,
                "Failed to assemble the audiobook",
                Some(err.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_failure_keeps_stderr_verbatim() {
        let err = PipelineError::Assembly(AssemblyError::Encoder {
            status: 1,
            stderr: "Invalid data found when processing input".into(),
        });
        let report = FailureReport::from(&err);
        assert_eq!(report.code, ERROR_ASSEMBLY);
        assert_eq!(
            report.details.as_deref(),
            Some("Invalid data found when processing input")
        );
        assert!(err.to_string().contains("Invalid data found"));
    }

    #[test]
    fn no_audio_report_has_stable_code() {
        let report = FailureReport::from(&PipelineError::NoAudio);
        assert_eq!(report.code, ERROR_NO_AUDIO);
        assert_eq!(report.message, "No audio generated");
    }
}
