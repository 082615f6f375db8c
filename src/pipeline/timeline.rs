use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A persisted [`AudioUnit`](crate::audio::AudioUnit). `index` is the only
/// ordering key the assembler looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFile {
    pub index: usize,
    pub path: PathBuf,
    pub duration: f64,
}

/// A named time range in the final audio, in seconds from its start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMarker {
    pub title: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

#[derive(Debug)]
struct OpenChapter {
    title: String,
    start_seconds: f64,
    segments: usize,
}

/// Running cumulative duration plus the markers closed so far.
#[derive(Debug, Default)]
pub struct Timeline {
    elapsed: f64,
    open: Option<OpenChapter>,
    markers: Vec<ChapterMarker>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Starts a chapter at the current offset, closing any open one first.
    pub fn open_chapter(&mut self, title: impl Into<String>) {
        self.close_chapter();
        self.open = Some(OpenChapter {
            title: title.into(),
            start_seconds: self.elapsed,
            segments: 0,
        });
    }

    /// Adds one segment's duration to the timeline and to the open chapter.
    pub fn advance(&mut self, duration: f64) {
        self.elapsed += duration.max(0.0);
        if let Some(open) = self.open.as_mut() {
            open.segments += 1;
        }
    }

    /// Closes the open chapter. A chapter that produced no audio gets no
    /// marker.
    pub fn close_chapter(&mut self) {
        if let Some(open) = self.open.take() {
            if open.segments > 0 {
                self.markers.push(ChapterMarker {
                    title: open.title,
                    start_seconds: open.start_seconds,
                    end_seconds: self.elapsed,
                });
            }
        }
    }

    pub fn into_markers(mut self) -> Vec<ChapterMarker> {
        self.close_chapter();
        self.markers
    }
}
