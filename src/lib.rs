pub mod assemble;
pub mod audio;
pub mod chapter;
pub mod dict;
pub mod error;
pub mod pipeline;
pub mod settings;
pub mod state;
pub mod synth;
pub mod text;
pub mod util;

pub use chapter::{load_chapters, Chapter};
pub use error::{FailureReport, PipelineError};
pub use pipeline::{
    run, spawn, BookInfo, CancellationToken, ChapterMarker, Collaborators, NarrationJob,
    PipelineEvent, PipelineState, RunHandle, RunOutcome, RunReport,
};
pub use settings::Settings;
