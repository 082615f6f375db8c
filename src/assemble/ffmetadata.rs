//! FFmpeg's line-oriented metadata format, used to hand chapter markers to
//! the encoder.

use crate::pipeline::ChapterMarker;

pub const FORMAT_MARKER: &str = ";FFMETADATA1";
pub const TIMEBASE: &str = "1/1000";

/// Renders one `[CHAPTER]` block per marker with millisecond offsets.
pub fn render(markers: &[ChapterMarker]) -> String {
    let mut document = String::from(FORMAT_MARKER);
    document.push('\n');
    for marker in markers {
        let start = millis(marker.start_seconds);
        let end = millis(marker.end_seconds).max(start);
        document.push_str("[CHAPTER]\n");
        document.push_str(&format!("TIMEBASE={TIMEBASE}\n"));
        document.push_str(&format!("START={start}\n"));
        document.push_str(&format!("END={end}\n"));
        document.push_str(&format!("title={}\n", escape(&marker.title)));
    }
    document
}

pub fn millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '=' | ';' | '#' | '\\' | '\n') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
