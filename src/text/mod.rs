//! Text normalization and segmentation.
//!
//! [`normalize`] turns raw chapter text into plain speakable prose whose
//! punctuation is reduced to two pause classes, and [`segment`] cuts it into
//! bounded-length utterances for the synthesis engine.

pub mod normalize;
pub mod numbers;
pub mod segment;

pub use normalize::{normalize, PauseClass};
pub use segment::{segment, segment_with_locale, Locale};

use crate::settings::Settings;

/// Normalizes and segments one chapter's content with the run settings.
pub fn utterances(content: &str, settings: &Settings) -> Vec<String> {
    let locale = Locale::from_language(&settings.language);
    segment_with_locale(&normalize(content), settings.max_chars, locale)
}
