use std::{
    ffi::OsString,
    path::PathBuf,
    process::{Command, Stdio},
};

use log::{error, info};

use super::{AudioEncoder, EncodeJob, EncoderFailure};

pub const FFMPEG_ENV: &str = "NARRATOR_FFMPEG_PATH";
/// Spoken word needs far less than music.
pub const NARRATION_BITRATE: &str = "64k";

pub fn locate_ffmpeg() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(FFMPEG_ENV) {
        let candidate = PathBuf::from(path);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    which::which("ffmpeg").ok()
}

/// Concatenates the manifest's WAV segments into mono AAC in an MP4
/// container, merging chapters from the metadata document when present.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: Option<PathBuf>,
}

impl FfmpegEncoder {
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

    fn args(job: &EncodeJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-y", "-f", "concat", "-safe", "0", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(job.manifest.clone().into_os_string());
        if let Some(chapters) = &job.chapters {
            args.push("-i".into());
            args.push(chapters.clone().into_os_string());
            args.extend(
                ["-map_metadata", "1", "-map_chapters", "1"]
                    .into_iter()
                    .map(OsString::from),
            );
        }
        args.extend(
            [
                "-map",
                "0:a",
                "-c:a",
                "aac",
                "-b:a",
                NARRATION_BITRATE,
                "-ac",
                "1",
                "-f",
                "mp4",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(job.output.clone().into_os_string());
        args
    }
}

impl AudioEncoder for FfmpegEncoder {
    fn encode(&self, job: &EncodeJob) -> Result<(), EncoderFailure> {
        let ffmpeg = self.binary.as_ref().ok_or_else(|| {
            EncoderFailure::Unavailable(format!(
                "ffmpeg is not on PATH; install it or set {FFMPEG_ENV}"
            ))
        })?;

        info!("Running ffmpeg to produce {}", job.output.display());
        let output = Command::new(ffmpeg)
            .args(Self::args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let status = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("ffmpeg exited with status {status}");
            return Err(EncoderFailure::Exited { status, stderr });
        }
        Ok(())
    }
}
