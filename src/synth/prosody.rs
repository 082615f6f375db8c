//! Prosody chunking: one sentence in, one [`AudioUnit`] out.
//!
//! With a comma pause configured, the sentence is rendered phrase by phrase
//! so the pause after each comma is under our control instead of the
//! engine's. Each phrase's trailing silence is trimmed before the pause is
//! inserted. If phrase-wise rendering produces no speech at all, the whole
//! sentence is rendered in a single call instead.

use log::debug;

use super::{SynthesisEngine, SynthesisRequest};
use crate::{
    audio::{create_silence, trim_trailing_silence, AudioUnit, PcmBuffer},
    dict::Corrections,
    error::SynthesisError,
    settings::Settings,
    text::PauseClass,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub text: String,
    /// Whether a comma followed this phrase in the sentence.
    pub comma_pause: bool,
}

/// Splits a sentence at phrase-level punctuation. The last phrase never
/// carries a comma pause.
pub fn split_phrases(sentence: &str) -> Vec<Phrase> {
    let mut phrases: Vec<Phrase> = sentence
        .split(|ch: char| PauseClass::of(ch) == Some(PauseClass::Phrase))
        .map(|piece| Phrase {
            text: piece.trim().to_string(),
            comma_pause: true,
        })
        .filter(|phrase| !phrase.text.is_empty())
        .collect();
    if let Some(last) = phrases.last_mut() {
        last.comma_pause = false;
    }
    phrases
}

/// Renders sentences for one run. Holds the run settings and the compiled
/// pronunciation corrections.
pub struct Prosody<'a> {
    settings: &'a Settings,
    corrections: &'a Corrections,
}

impl<'a> Prosody<'a> {
    pub fn new(settings: &'a Settings, corrections: &'a Corrections) -> Self {
        Self {
            settings,
            corrections,
        }
    }

    pub fn render(
        &self,
        sentence: &str,
        engine: &mut dyn SynthesisEngine,
    ) -> Result<AudioUnit, SynthesisError> {
        let text = self.corrections.apply(sentence);

        let phrased = match self.settings.comma_pause() {
            Some(pause) => self.render_phrases(&text, pause, engine)?,
            None => None,
        };
        let (mut samples, sample_rate) = match phrased {
            Some(rendered) => rendered,
            None => self.render_whole(&text, engine)?,
        };

        samples.extend(create_silence(
            self.settings.sentence_pause_seconds,
            sample_rate,
        ));
        Ok(AudioUnit::new(samples, sample_rate))
    }

    /// `None` when no phrase produced any speech.
    fn render_phrases(
        &self,
        text: &str,
        pause: f64,
        engine: &mut dyn SynthesisEngine,
    ) -> Result<Option<(Vec<f32>, u32)>, SynthesisError> {
        let mut samples = Vec::new();
        let mut sample_rate: Option<u32> = None;
        let mut speech = 0usize;

        for phrase in split_phrases(text) {
            let mut buffer = self.call(&phrase.text, engine)?;
            let rate = *sample_rate.get_or_insert(buffer.sample_rate);
            if buffer.sample_rate != rate {
                return Err(SynthesisError::SampleRateMismatch {
                    expected: rate,
                    found: buffer.sample_rate,
                });
            }
            trim_trailing_silence(&mut buffer.samples);
            speech += buffer.samples.len();
            samples.append(&mut buffer.samples);
            if phrase.comma_pause {
                samples.extend(create_silence(pause, rate));
            }
        }

        match sample_rate {
            Some(rate) if speech > 0 && rate > 0 => Ok(Some((samples, rate))),
            _ => {
                debug!("Phrase-wise rendering produced no speech, rendering whole sentence");
                Ok(None)
            }
        }
    }

    fn render_whole(
        &self,
        text: &str,
        engine: &mut dyn SynthesisEngine,
    ) -> Result<(Vec<f32>, u32), SynthesisError> {
        let buffer = self.call(text, engine)?;
        if buffer.is_empty() || buffer.sample_rate == 0 {
            return Err(SynthesisError::NoAudio);
        }
        Ok((buffer.samples, buffer.sample_rate))
    }

    fn call(
        &self,
        text: &str,
        engine: &mut dyn SynthesisEngine,
    ) -> Result<PcmBuffer, SynthesisError> {
        let request = SynthesisRequest {
            text,
            voice_id: &self.settings.voice_id,
            speed: self.settings.speed,
        };
        Ok(engine.synthesize(&request)?)
    }
}
