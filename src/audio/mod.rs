//! PCM buffers and the sample-level helpers shared by the prosody chunker and
//! the orchestrator.
//!
//! All arithmetic on pauses happens in whole samples: [`create_silence`]
//! rounds `seconds * sample_rate` once, so cumulative timestamps derived from
//! sample counts never drift.

pub mod wav;

pub use wav::{read_wav, write_wav};

/// Samples at or below this magnitude count as silence when trimming.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Raw mono output of one engine call.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Rendered audio for one utterance, pauses included. Not mutated after
/// creation.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUnit {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioUnit {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds, derived from the sample count.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Number of samples covering `seconds` at `sample_rate`, rounded once.
pub fn silence_samples(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as usize
}

/// Zero-amplitude buffer of exactly `round(seconds * sample_rate)` samples.
pub fn create_silence(seconds: f64, sample_rate: u32) -> Vec<f32> {
    vec![0.0; silence_samples(seconds, sample_rate)]
}

/// Drops the trailing run of samples whose magnitude does not exceed
/// [`SILENCE_THRESHOLD`]. An all-silent buffer becomes empty.
pub fn trim_trailing_silence(samples: &mut Vec<f32>) {
    let keep = samples
        .iter()
        .rposition(|sample| sample.abs() > SILENCE_THRESHOLD)
        .map_or(0, |last| last + 1);
    samples.truncate(keep);
}
