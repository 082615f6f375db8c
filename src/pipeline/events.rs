use std::path::PathBuf;

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use serde::Serialize;

use super::{state::PipelineState, timeline::ChapterMarker};
use crate::error::FailureReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One-way notifications from the worker to whoever presents the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    State { state: PipelineState },
    Progress { percent: u8 },
    Eta { seconds: u64 },
    Log { level: LogLevel, message: String },
    Chapters { markers: Vec<ChapterMarker> },
    Cancelled { partial_output_path: PathBuf },
    Completed { output_path: PathBuf },
    Failed { error: FailureReport },
}

/// Sending half of the event channel. Sends never block, and a consumer that
/// went away is not an error for the worker.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<Sender<PipelineEvent>>,
}

impl EventSink {
    pub fn new(sender: Sender<PipelineEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sink with no consumer; events only reach the log.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                debug!("Event consumer disconnected");
            }
        }
    }

    /// Mirrors the message to the log facade and emits a `Log` event.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!("{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
        self.emit(PipelineEvent::Log { level, message });
    }
}
