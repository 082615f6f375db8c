use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use log::info;
use time::{macros::format_description, Date, OffsetDateTime};

use super::{ffmpeg::locate_ffmpeg, TagWriter};
use crate::error::TaggingError;

/// Book-level metadata embedded after encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookTags {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover: Option<PathBuf>,
}

pub fn narration_comment(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    match date.format(&format) {
        Ok(day) => format!("Narrated on {day}"),
        Err(_) => "Narrated".to_string(),
    }
}

/// Remuxes the encoded file with stream copy, keeping its chapters, into a
/// sibling temporary file that replaces the original on success.
#[derive(Debug, Clone)]
pub struct FfmpegTagWriter {
    binary: Option<PathBuf>,
}

impl FfmpegTagWriter {
    pub fn locate() -> Self {
        Self {
            binary: locate_ffmpeg(),
        }
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary: Some(binary),
        }
    }

    fn args(input: &Path, output: &Path, tags: &BookTags, comment: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-y".into(), "-i".into()];
        args.push(input.as_os_str().to_owned());

        let cover = tags.cover.as_ref().filter(|path| path.exists());
        match cover {
            Some(cover) => {
                args.push("-i".into());
                args.push(cover.as_os_str().to_owned());
                for arg in [
                    "-map",
                    "0:a",
                    "-map",
                    "1:v",
                    "-c",
                    "copy",
                    "-disposition:v:0",
                    "attached_pic",
                ] {
                    args.push(arg.into());
                }
            }
            None => {
                for arg in ["-map", "0", "-c", "copy"] {
                    args.push(arg.into());
                }
            }
        }
        args.push("-map_chapters".into());
        args.push("0".into());

        let mut metadata = vec![("comment", comment.to_string())];
        if let Some(title) = &tags.title {
            metadata.push(("title", title.clone()));
            metadata.push(("album", title.clone()));
        }
        if let Some(author) = &tags.author {
            metadata.push(("artist", author.clone()));
        }
        for (key, value) in metadata {
            args.push("-metadata".into());
            args.push(format!("{key}={value}").into());
        }

        args.push("-f".into());
        args.push("mp4".into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl TagWriter for FfmpegTagWriter {
    fn write_tags(&self, path: &Path, tags: &BookTags) -> Result<(), TaggingError> {
        let ffmpeg = self
            .binary
            .as_ref()
            .ok_or_else(|| TaggingError::Unavailable("ffmpeg is not on PATH".into()))?;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let staged = tempfile::Builder::new()
            .prefix(".narrator-tags-")
            .suffix(".m4b")
            .tempfile_in(parent)
            .map_err(|source| TaggingError::Io {
                path: parent.to_path_buf(),
                source,
            })?;

        let comment = narration_comment(OffsetDateTime::now_utc().date());
        let output = Command::new(ffmpeg)
            .args(Self::args(path, staged.path(), tags, &comment))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| TaggingError::Unavailable(err.to_string()))?;
        if !output.status.success() {
            return Err(TaggingError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        staged.persist(path).map_err(|err| TaggingError::Io {
            path: path.to_path_buf(),
            source: err.error,
        })?;
        info!("Tagged {}", path.display());
        Ok(())
    }
}
