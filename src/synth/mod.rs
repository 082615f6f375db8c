//! The synthesis side of the pipeline: the engine seam, the Piper engine,
//! installed voices and the prosody chunker.

pub mod piper;
pub mod prosody;
pub mod voices;

pub use piper::{PiperEngine, PiperLauncher};
pub use prosody::{split_phrases, Phrase, Prosody};
pub use voices::{VoiceError, VoiceInfo, VoiceLibrary};

use crate::{audio::PcmBuffer, error::EngineError, settings::Settings};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub speed: f32,
}

/// A neural text-to-speech engine. Calls block until the audio is ready and
/// are never issued concurrently for one run.
pub trait SynthesisEngine: Send {
    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<PcmBuffer, EngineError>;
}

/// Acquires an engine for exclusive use by one run.
pub trait EngineLauncher: Send + Sync {
    fn launch(&self, settings: &Settings) -> Result<Box<dyn SynthesisEngine>, EngineError>;
}
