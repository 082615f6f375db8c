//! Chapters as delivered by document extraction: a JSON array, or a plain
//! text file treated as a single chapter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChapterSourceError {
    #[error("failed to read chapters from {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse chapters JSON {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub order: u32,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_toc: bool,
}

pub fn load_chapters(path: &Path) -> Result<Vec<Chapter>, ChapterSourceError> {
    let data =
        fs::read_to_string(path).map_err(|err| ChapterSourceError::Io(path.to_path_buf(), err))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return serde_json::from_str(&data)
            .map_err(|err| ChapterSourceError::Parse(path.to_path_buf(), err));
    }

    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Chapter 1".to_string());
    Ok(vec![Chapter {
        order: 1,
        title,
        content: text_content(&data),
        is_toc: false,
    }])
}

/// Joins hard-wrapped lines and separates paragraphs with a blank line.
pub fn extract_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        current.push(line.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

/// Paragraphs without terminal punctuation (headings, list items) get a
/// period so they are read as a sentence of their own.
fn text_content(text: &str) -> String {
    extract_paragraphs(text)
        .into_iter()
        .map(|mut paragraph| {
            let terminated = paragraph
                .trim_end_matches(['"', '\'', ')'])
                .ends_with(['.', '!', '?']);
            if !terminated {
                paragraph.push('.');
            }
            paragraph
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn splits_paragraphs_on_blank_lines() {
        let text = "Line one\nline two\n\nLine three";
        let paragraphs = extract_paragraphs(text);
        assert_eq!(paragraphs, vec!["Line one line two", "Line three"]);
    }

    #[test]
    fn trims_extra_whitespace() {
        let text = "  Hello   world  \n\n \t Another paragraph \n";
        let paragraphs = extract_paragraphs(text);
        assert_eq!(paragraphs, vec!["Hello world", "Another paragraph"]);
    }

    #[test]
    fn ignores_multiple_blank_lines() {
        let text = "One\n\n\nTwo";
        let paragraphs = extract_paragraphs(text);
        assert_eq!(paragraphs, vec!["One", "Two"]);
    }

    #[test]
    fn loads_json_chapters() {
        let file = assert_fs::NamedTempFile::new("book.json").unwrap();
        file.write_str(
            r#"[
                {"order": 0, "title": "Contents", "content": "One. Two.", "is_toc": true},
                {"order": 1, "title": "One", "content": "It begins."}
            ]"#,
        )
        .unwrap();
        let chapters = load_chapters(file.path()).unwrap();
        assert_eq!(chapters.len(), 2);
        assert!(chapters[0].is_toc);
        assert!(!chapters[1].is_toc);
        assert_eq!(chapters[1].content, "It begins.");
    }

    #[test]
    fn plain_text_is_one_chapter_with_terminated_headings() {
        let file = assert_fs::NamedTempFile::new("the-voyage.txt").unwrap();
        file.write_str("CHAPTER ONE\n\nIt was a dark\nand stormy night.\n")
            .unwrap();
        let chapters = load_chapters(file.path()).unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "the-voyage");
        assert_eq!(
            chapters[0].content,
            "CHAPTER ONE.\n\nIt was a dark and stormy night."
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        let file = assert_fs::NamedTempFile::new("broken.json").unwrap();
        file.write_str("{not json").unwrap();
        assert!(matches!(
            load_chapters(file.path()),
            Err(ChapterSourceError::Parse(..))
        ));
    }
}
