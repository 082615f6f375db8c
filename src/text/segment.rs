use log::debug;
use unicode_segmentation::UnicodeSegmentation;

const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "St.", "Jr.", "Sr.", "vs.", "e.g.", "i.e.",
];
const SPANISH_ABBREVIATIONS: &[&str] = &["Sr.", "Sra.", "Dr.", "Dra.", "Ud.", "Uds.", "etc."];

/// Sentence boundary rules for a configured language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Spanish,
}

impl Locale {
    pub fn from_language(code: &str) -> Self {
        let primary = code
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Locale::English,
            "es" => Locale::Spanish,
            other => {
                debug!("No sentence rules for language '{other}', using English");
                Locale::English
            }
        }
    }

    fn abbreviations(self) -> &'static [&'static str] {
        match self {
            Locale::English => ENGLISH_ABBREVIATIONS,
            Locale::Spanish => SPANISH_ABBREVIATIONS,
        }
    }
}

/// Splits text into utterances of at most `max_chars` characters, using
/// English sentence rules.
pub fn segment(text: &str, max_chars: usize) -> Vec<String> {
    segment_with_locale(text, max_chars, Locale::English)
}

pub fn segment_with_locale(text: &str, max_chars: usize, locale: Locale) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    for sentence in split_sentences(text, locale) {
        if sentence.chars().count() <= max_chars {
            segments.push(sentence);
        } else {
            repack_words(&sentence, max_chars, &mut segments);
        }
    }
    segments
}

fn split_sentences(text: &str, locale: Locale) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut pending = String::new();
    for piece in text.unicode_sentences() {
        pending.push_str(piece);
        if ends_with_abbreviation(pending.trim_end(), locale.abbreviations()) {
            continue;
        }
        let sentence = pending.trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        pending.clear();
    }
    let tail = pending.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

fn ends_with_abbreviation(sentence: &str, abbreviations: &[&str]) -> bool {
    abbreviations.iter().any(|abbr| {
        sentence.strip_suffix(abbr).is_some_and(|head| {
            head.chars()
                .last()
                .map_or(true, |ch| ch.is_whitespace() || ch == '(' || ch == '"')
        })
    })
}

/// Greedy word-wise packing. Never breaks a word: a word longer than
/// `max_chars` becomes a segment of its own.
fn repack_words(sentence: &str, max_chars: usize, segments: &mut Vec<String>) {
    let mut buffer = String::new();
    let mut buffer_len = 0;
    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();
        if buffer.is_empty() {
            buffer.push_str(word);
            buffer_len = word_len;
        } else if buffer_len + 1 + word_len <= max_chars {
            buffer.push(' ');
            buffer.push_str(word);
            buffer_len += 1 + word_len;
        } else {
            segments.push(std::mem::take(&mut buffer));
            buffer.push_str(word);
            buffer_len = word_len;
        }
    }
    if !buffer.is_empty() {
        segments.push(buffer);
    }
}
