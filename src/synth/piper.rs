use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
    time::Instant,
};

use log::{debug, error, info, warn};
use tempfile::TempDir;

use super::{EngineLauncher, SynthesisEngine, SynthesisRequest, VoiceLibrary};
use crate::{
    audio::{read_wav, PcmBuffer},
    error::EngineError,
    settings::Settings,
    util::piper_path::{self, PiperCommand},
};

/// Starts [`PiperEngine`]s for voices found in a [`VoiceLibrary`].
pub struct PiperLauncher {
    runtime_dir: PathBuf,
    voices: Arc<VoiceLibrary>,
}

impl PiperLauncher {
    pub fn new(runtime_dir: PathBuf, voices: Arc<VoiceLibrary>) -> Self {
        Self {
            runtime_dir,
            voices,
        }
    }
}

impl EngineLauncher for PiperLauncher {
    fn launch(&self, settings: &Settings) -> Result<Box<dyn SynthesisEngine>, EngineError> {
        let voice = self
            .voices
            .get(&settings.voice_id)
            .map_err(|_| EngineError::VoiceNotFound(settings.voice_id.clone()))?;
        let command = piper_path::resolve(&self.runtime_dir)
            .map_err(|err| EngineError::Unavailable(err.to_string()))?;
        if !voice.speaks(&settings.language) {
            warn!(
                "Voice {} reads {}, not the configured language {}",
                voice.id,
                voice.language.as_deref().unwrap_or("an unknown language"),
                settings.language
            );
        }
        info!(
            "Using Piper voice {} ({})",
            voice.id,
            voice.model_path.display()
        );
        Ok(Box::new(PiperEngine::new(command, voice.model_path)?))
    }
}

/// One Piper process per call; text goes in on stdin, a WAV file comes out.
pub struct PiperEngine {
    command: PiperCommand,
    model_path: PathBuf,
    work_dir: TempDir,
    calls: u64,
}

impl PiperEngine {
    pub fn new(command: PiperCommand, model_path: PathBuf) -> Result<Self, EngineError> {
        if !model_path.exists() {
            return Err(EngineError::ModelMissing(model_path));
        }
        let work_dir = tempfile::Builder::new()
            .prefix("narrator-piper-")
            .tempdir()?;
        Ok(Self {
            command,
            model_path,
            work_dir,
            calls: 0,
        })
    }

    fn build_command(&self, output_path: &Path, speed: f32) -> Command {
        let (program, args) = piper_path::command_to_args(&self.command);
        let mut command = Command::new(program);
        command.args(args);
        command.arg("--model");
        command.arg(&self.model_path);
        command.arg("--output_file");
        command.arg(output_path);
        command.arg("--length_scale");
        command.arg(format!("{:.3}", 1.0 / speed));
        command.arg("--sentence_silence");
        command.arg("0");
        command
    }
}

impl SynthesisEngine for PiperEngine {
    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<PcmBuffer, EngineError> {
        self.calls += 1;
        let output_path = self.work_dir.path().join(format!("call_{:06}.wav", self.calls));
        let start = Instant::now();

        let mut child = self
            .build_command(&output_path, request.speed)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        // A write error usually means Piper exited early; its status and
        // stderr are collected before the write error is reported.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin
                .write_all(request.text.as_bytes())
                .and_then(|()| stdin.write_all(b"\n")),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "failed to access Piper stdin",
            )),
        };
        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let status = output.status.code().unwrap_or(-1);
            error!("Piper exited with status {status}: {stderr}");
            return Err(EngineError::Process { status, stderr });
        }
        written?;
        if !output_path.exists() {
            return Err(EngineError::Other(format!(
                "Piper succeeded but did not create {}",
                output_path.display()
            )));
        }

        let buffer = read_wav(&output_path);
        if let Err(err) = std::fs::remove_file(&output_path) {
            debug!("Could not remove {}: {err}", output_path.display());
        }
        let buffer = buffer?;
        debug!(
            "Piper rendered {} samples in {} ms",
            buffer.samples.len(),
            start.elapsed().as_millis()
        );
        Ok(buffer)
    }
}
