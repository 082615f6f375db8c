use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use parking_lot::RwLock;
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse dictionary JSON {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub word: String,
    pub replacement: String,
}

/// Persistent pronunciation dictionary backing
/// `Settings::pronunciation_corrections`.
#[derive(Default)]
pub struct Dictionary {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl Dictionary {
    pub fn load_or_default(path: PathBuf) -> Result<Self, DictionaryError> {
        if !path.exists() {
            return Ok(Self {
                path,
                entries: RwLock::new(HashMap::new()),
            });
        }

        let data =
            fs::read_to_string(&path).map_err(|err| DictionaryError::Io(path.clone(), err))?;
        let parsed: Vec<DictionaryEntry> =
            serde_json::from_str(&data).map_err(|err| DictionaryError::Parse(path.clone(), err))?;
        Ok(Self {
            path,
            entries: RwLock::new(to_map(parsed)),
        })
    }

    pub fn entries(&self) -> Vec<DictionaryEntry> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(word, replacement)| DictionaryEntry {
                word: word.clone(),
                replacement: replacement.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.word.cmp(&b.word));
        entries
    }

    /// Inserts or replaces one entry and persists the whole dictionary.
    pub fn upsert(&self, entry: DictionaryEntry) -> Result<(), DictionaryError> {
        let mut entries = self.entries();
        entries.retain(|existing| !existing.word.eq_ignore_ascii_case(&entry.word));
        entries.push(entry);
        self.update(entries)
    }

    pub fn update(&self, entries: Vec<DictionaryEntry>) -> Result<(), DictionaryError> {
        let map = to_map(entries);
        let mut serialisable: Vec<DictionaryEntry> = map
            .iter()
            .map(|(word, replacement)| DictionaryEntry {
                word: word.clone(),
                replacement: replacement.clone(),
            })
            .collect();
        serialisable.sort_by(|a, b| a.word.cmp(&b.word));

        let json = serde_json::to_string_pretty(&serialisable)
            .map_err(|err| DictionaryError::Parse(self.path.clone(), err))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| DictionaryError::Io(parent.to_path_buf(), err))?;
        }
        fs::write(&self.path, json).map_err(|err| DictionaryError::Io(self.path.clone(), err))?;

        *self.entries.write() = map;
        Ok(())
    }

    /// Dictionary entries overlaid with `overrides`; the overrides win.
    pub fn merged_with(&self, overrides: &HashMap<String, String>) -> HashMap<String, String> {
        let mut merged = self.entries.read().clone();
        for (word, replacement) in overrides {
            merged.insert(word.to_lowercase(), replacement.clone());
        }
        merged
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn to_map(entries: Vec<DictionaryEntry>) -> HashMap<String, String> {
    entries
        .into_iter()
        .filter(|entry| !entry.word.trim().is_empty())
        .map(|entry| (entry.word.trim().to_lowercase(), entry.replacement))
        .collect()
}

/// Corrections compiled once per run: whole-word, case-insensitive.
#[derive(Debug, Default)]
pub struct Corrections {
    rules: Vec<(Regex, String)>,
}

impl Corrections {
    pub fn compile(map: &HashMap<String, String>) -> Self {
        let mut words: Vec<(&String, &String)> = map
            .iter()
            .filter(|(word, _)| !word.trim().is_empty())
            .collect();
        // Longer keys first so multi-word entries win over their parts.
        words.sort_by(|a, b| {
            b.0.chars()
                .count()
                .cmp(&a.0.chars().count())
                .then_with(|| a.0.cmp(b.0))
        });

        let rules = words
            .into_iter()
            .filter_map(|(word, replacement)| match word_pattern(word.trim()) {
                Ok(regex) => Some((regex, replacement.clone())),
                Err(err) => {
                    warn!("Skipping pronunciation entry '{word}': {err}");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, input: &str) -> String {
        let mut output = input.to_string();
        for (pattern, replacement) in &self.rules {
            output = pattern
                .replace_all(&output, NoExpand(replacement))
                .into_owned();
        }
        output
    }
}

fn word_pattern(word: &str) -> Result<Regex, regex::Error> {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::new();
    if word.chars().next().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(word));
    if word.chars().last().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn corrections(pairs: &[(&str, &str)]) -> Corrections {
        let map = pairs
            .iter()
            .map(|(word, replacement)| (word.to_string(), replacement.to_string()))
            .collect();
        Corrections::compile(&map)
    }

    #[test]
    fn loads_dictionary_entries() {
        let file = assert_fs::NamedTempFile::new("dict.json").unwrap();
        file.write_str(r#"[{"word":"Hermione","replacement":"her-my-oh-nee"}]"#)
            .unwrap();
        let dict = Dictionary::load_or_default(file.path().to_path_buf()).unwrap();
        assert_eq!(dict.entries().len(), 1);
        assert_eq!(dict.entries()[0].word, "hermione");
    }

    #[test]
    fn missing_file_is_empty_dictionary() {
        let dict = Dictionary::load_or_default(PathBuf::from("does/not/exist.json")).unwrap();
        assert!(dict.entries().is_empty());
    }

    #[test]
    fn upsert_persists_entries() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("dictionary.json");
        let dict = Dictionary::load_or_default(path.clone()).unwrap();
        dict.upsert(DictionaryEntry {
            word: "Nguyen".into(),
            replacement: "win".into(),
        })
        .unwrap();
        dict.upsert(DictionaryEntry {
            word: "nguyen".into(),
            replacement: "nwin".into(),
        })
        .unwrap();

        let reloaded = Dictionary::load_or_default(path).unwrap();
        assert_eq!(
            reloaded.entries(),
            vec![DictionaryEntry {
                word: "nguyen".into(),
                replacement: "nwin".into()
            }]
        );
    }

    #[test]
    fn settings_override_dictionary_entries() {
        let temp = assert_fs::TempDir::new().unwrap();
        let dict = Dictionary::load_or_default(temp.path().join("d.json")).unwrap();
        dict.update(vec![
            DictionaryEntry {
                word: "Siobhan".into(),
                replacement: "shiv-awn".into(),
            },
            DictionaryEntry {
                word: "Daisy".into(),
                replacement: "day-zee".into(),
            },
        ])
        .unwrap();
        let overrides = HashMap::from([("SIOBHAN".to_string(), "shi-vaughn".to_string())]);
        let merged = dict.merged_with(&overrides);
        assert_eq!(merged["siobhan"], "shi-vaughn");
        assert_eq!(merged["daisy"], "day-zee");
    }

    #[test]
    fn applies_whole_words_case_insensitively() {
        let rules = corrections(&[("Gatsby", "Gats-bee")]);
        assert_eq!(
            rules.apply("gatsby met GATSBY at Gatsbys"),
            "Gats-bee met Gats-bee at Gatsbys"
        );
    }

    #[test]
    fn replacement_text_is_literal() {
        let rules = corrections(&[("cash", "$1 money")]);
        assert_eq!(rules.apply("cash now"), "$1 money now");
    }

    #[test]
    fn longer_entries_win() {
        let rules = corrections(&[("New", "noo"), ("New York", "noo york")]);
        assert_eq!(rules.apply("New York is new"), "noo york is noo");
    }
}
