use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use shlex::Shlex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PiperCommand {
    /// Program and leading arguments taken from `NARRATOR_PIPER_COMMAND`.
    Custom(Vec<String>),
    Executable(PathBuf),
    PythonModule,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PiperPathError {
    #[error("NARRATOR_PIPER_COMMAND is empty")]
    EmptyOverride,
    #[error("piper was not found in {0} and python is not available on PATH")]
    Unavailable(PathBuf),
}

/// Finds the Piper command: explicit override, bundled executable, then
/// `python -m piper`.
pub fn resolve(runtime_dir: &Path) -> Result<PiperCommand, PiperPathError> {
    if let Some(raw) = std::env::var_os("NARRATOR_PIPER_COMMAND") {
        let raw = raw.to_string_lossy().into_owned();
        let parts: Vec<String> = Shlex::new(&raw).collect();
        if parts.is_empty() {
            return Err(PiperPathError::EmptyOverride);
        }
        return Ok(PiperCommand::Custom(parts));
    }

    let piper_dir = runtime_dir.join("piper");
    let candidate = piper_dir.join(if cfg!(windows) { "piper.exe" } else { "piper" });
    if candidate.exists() {
        return Ok(PiperCommand::Executable(candidate));
    }

    if which::which("python").is_ok() {
        return Ok(PiperCommand::PythonModule);
    }

    Err(PiperPathError::Unavailable(piper_dir))
}

pub fn command_to_args(cmd: &PiperCommand) -> (OsString, Vec<OsString>) {
    match cmd {
        PiperCommand::Custom(parts) => {
            let mut parts = parts.iter().map(OsString::from);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect())
        }
        PiperCommand::Executable(path) => (path.as_os_str().into(), vec![]),
        PiperCommand::PythonModule => (
            OsString::from("python"),
            vec!["-m".into(), "piper".into()],
        ),
    }
}
