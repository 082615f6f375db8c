//! Final assembly: concat manifest and chapter metadata in, one encoded
//! audiobook out, then best-effort tagging.

pub mod ffmetadata;
pub mod ffmpeg;
pub mod tags;

pub use ffmpeg::{locate_ffmpeg, FfmpegEncoder};
pub use tags::{BookTags, FfmpegTagWriter};

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    error::{AssemblyError, TaggingError},
    pipeline::{ChapterMarker, SegmentFile},
};

const MANIFEST_NAME: &str = "concat.txt";
const METADATA_NAME: &str = "chapters.ffmetadata";

/// Inputs of a single encoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub manifest: PathBuf,
    pub chapters: Option<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum EncoderFailure {
    #[error("{0}")]
    Unavailable(String),
    #[error("failed to run encoder: {0}")]
    Spawn(#[from] io::Error),
    #[error("encoder exited with status {status}: {stderr}")]
    Exited { status: i32, stderr: String },
}

impl From<EncoderFailure> for AssemblyError {
    fn from(failure: EncoderFailure) -> Self {
        match failure {
            EncoderFailure::Unavailable(message) => AssemblyError::EncoderUnavailable(message),
            EncoderFailure::Spawn(err) => AssemblyError::EncoderUnavailable(err.to_string()),
            EncoderFailure::Exited { status, stderr } => AssemblyError::Encoder { status, stderr },
        }
    }
}

/// External encoder/muxer. One blocking call per run.
pub trait AudioEncoder: Send + Sync {
    fn encode(&self, job: &EncodeJob) -> Result<(), EncoderFailure>;
}

pub trait TagWriter: Send + Sync {
    fn write_tags(&self, path: &Path, tags: &BookTags) -> Result<(), TaggingError>;
}

#[derive(Debug, Default)]
pub struct AssemblyReport {
    /// Set when the audio was produced but tagging failed.
    pub tagging_error: Option<TaggingError>,
}

pub struct Assembler<'a> {
    encoder: &'a dyn AudioEncoder,
    tagger: Option<&'a dyn TagWriter>,
}

impl<'a> Assembler<'a> {
    pub fn new(encoder: &'a dyn AudioEncoder, tagger: Option<&'a dyn TagWriter>) -> Self {
        Self { encoder, tagger }
    }

    /// Encodes `segments` in index order into `output`. Manifest and chapter
    /// metadata are written to `scratch` and removed before returning.
    pub fn assemble(
        &self,
        segments: &[SegmentFile],
        markers: &[ChapterMarker],
        output: &Path,
        tags: &BookTags,
        scratch: &Path,
    ) -> Result<AssemblyReport, AssemblyError> {
        let manifest_body = manifest(segments)?;

        let manifest = ScratchFile::write(scratch.join(MANIFEST_NAME), &manifest_body)?;
        let chapters = if markers.is_empty() {
            None
        } else {
            Some(ScratchFile::write(
                scratch.join(METADATA_NAME),
                &ffmetadata::render(markers),
            )?)
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| AssemblyError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let job = EncodeJob {
            manifest: manifest.path.clone(),
            chapters: chapters.as_ref().map(|file| file.path.clone()),
            output: output.to_path_buf(),
        };
        info!(
            "Encoding {} segments and {} chapters into {}",
            segments.len(),
            markers.len(),
            output.display()
        );
        self.encoder.encode(&job)?;
        drop(chapters);
        drop(manifest);

        let mut report = AssemblyReport::default();
        if let Some(tagger) = self.tagger {
            if let Err(err) = tagger.write_tags(output, tags) {
                debug!("Failed to tag {}: {err}", output.display());
                report.tagging_error = Some(err);
            }
        }
        Ok(report)
    }
}

/// Concat-demuxer manifest: one `file '<absolute path>'` line per segment,
/// in index order.
fn manifest(segments: &[SegmentFile]) -> Result<String, AssemblyError> {
    if segments.is_empty() {
        return Err(AssemblyError::NoSegments);
    }
    let mut body = String::from("ffconcat version 1.0\n");
    for (expected, segment) in segments.iter().enumerate() {
        if segment.index != expected {
            return Err(AssemblyError::SegmentOrder {
                expected,
                found: segment.index,
            });
        }
        let path = fs::canonicalize(&segment.path)
            .map_err(|_| AssemblyError::MissingSegment(segment.path.clone()))?;
        body.push_str(&format!("file '{}'\n", quote(&path)));
    }
    Ok(body)
}

fn quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// A scratch file removed on drop.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn write(path: PathBuf, contents: &str) -> Result<Self, AssemblyError> {
        fs::write(&path, contents).map_err(|source| AssemblyError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {err}", self.path.display());
            }
        }
    }
}
