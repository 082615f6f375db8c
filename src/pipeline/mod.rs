//! The narration run: one worker drives chapters through normalization,
//! prosody rendering and persistence, then hands the ordered segments and
//! chapter markers to the assembler.
//!
//! The presentation side only ever sees [`PipelineEvent`]s and holds a
//! [`CancellationToken`]. Cancellation is polled between utterances, so an
//! in-flight engine call always finishes first.

pub mod cancel;
pub mod events;
pub mod progress;
pub mod scratch;
pub mod state;
pub mod timeline;

pub use cancel::CancellationToken;
pub use events::{EventSink, LogLevel, PipelineEvent};
pub use progress::ProgressTracker;
pub use scratch::ScratchDir;
pub use state::PipelineState;
pub use timeline::{ChapterMarker, SegmentFile, Timeline};

use std::{
    io,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::Receiver;

use crate::{
    assemble::{Assembler, AudioEncoder, BookTags, TagWriter},
    audio::write_wav,
    chapter::Chapter,
    dict::Corrections,
    error::{FailureReport, InitializationError, PipelineError, SynthesisError},
    settings::Settings,
    synth::{EngineLauncher, Prosody, SynthesisEngine},
    text::{self, Locale},
};

pub const INTRO_PREFIX: &str = "The following is a machine-generated audiobook.";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover: Option<PathBuf>,
}

impl BookInfo {
    /// Spoken introduction, present only when the book has a title.
    pub fn intro_text(&self) -> Option<String> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())?;
        let author = self
            .author
            .as_deref()
            .map(str::trim)
            .filter(|author| !author.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR);
        Some(format!("{INTRO_PREFIX} {title}. by {author}."))
    }

    pub fn tags(&self) -> BookTags {
        BookTags {
            title: self.title.clone(),
            author: self.author.clone(),
            cover: self.cover.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NarrationJob {
    pub chapters: Vec<Chapter>,
    pub settings: Settings,
    pub output_path: PathBuf,
    pub book: BookInfo,
    pub skip_toc: bool,
    /// Parent of the run's scratch directory; the system temp dir when unset.
    pub scratch_root: Option<PathBuf>,
}

/// The blocking collaborators of a run. Each is used by one worker only.
pub struct Collaborators {
    pub launcher: Box<dyn EngineLauncher>,
    pub encoder: Box<dyn AudioEncoder>,
    pub tagger: Option<Box<dyn TagWriter>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { output_path: PathBuf },
    /// The output holds only the utterances finished before cancellation.
    Cancelled { partial_output_path: PathBuf },
    Failed(FailureReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub markers: Vec<ChapterMarker>,
    pub segments: usize,
    pub skipped: usize,
}

#[derive(Debug)]
struct PlannedChapter {
    title: String,
    utterances: Vec<String>,
}

/// Every utterance of the run, computed before the first engine call so
/// progress is measured against the whole book.
#[derive(Debug)]
struct Plan {
    intro: Vec<String>,
    chapters: Vec<PlannedChapter>,
}

impl Plan {
    fn build(job: &NarrationJob) -> Self {
        let settings = &job.settings;
        let intro = job
            .book
            .intro_text()
            .map(|intro| {
                let spoken = text::normalize(&intro);
                if spoken.chars().count() <= settings.max_chars {
                    vec![spoken]
                } else {
                    let locale = Locale::from_language(&settings.language);
                    text::segment_with_locale(&spoken, settings.max_chars, locale)
                }
            })
            .unwrap_or_default();

        let mut selected: Vec<&Chapter> = job
            .chapters
            .iter()
            .filter(|chapter| !(job.skip_toc && chapter.is_toc))
            .collect();
        selected.sort_by_key(|chapter| chapter.order);
        let chapters = selected
            .into_iter()
            .map(|chapter| PlannedChapter {
                title: chapter.title.clone(),
                utterances: text::utterances(&chapter.content, settings),
            })
            .collect();

        Self { intro, chapters }
    }

    fn total(&self) -> usize {
        self.intro.len()
            + self
                .chapters
                .iter()
                .map(|chapter| chapter.utterances.len())
                .sum::<usize>()
    }
}

/// Synthesis-phase state: the engine, the segments written so far and the
/// running timeline.
struct Synthesizer<'a> {
    prosody: Prosody<'a>,
    engine: Box<dyn SynthesisEngine>,
    scratch: &'a Path,
    events: &'a EventSink,
    segments: Vec<SegmentFile>,
    timeline: Timeline,
    progress: ProgressTracker,
    skipped: usize,
}

impl Synthesizer<'_> {
    /// Renders and persists one utterance. Failures are logged and skipped.
    fn utterance(&mut self, text: &str) {
        let started = Instant::now();
        let number = self.progress.done() + 1;
        match self.render(text) {
            Ok(segment) => {
                self.timeline.advance(segment.duration);
                self.segments.push(segment);
            }
            Err(err) => {
                self.skipped += 1;
                self.events.log(
                    LogLevel::Warn,
                    format!("Skipping sentence {number} \"{}\": {err}", preview(text)),
                );
            }
        }

        self.progress.record(started.elapsed());
        self.events.emit(PipelineEvent::Progress {
            percent: self.progress.percent(),
        });
        if let Some(seconds) = self.progress.eta_seconds() {
            self.events.emit(PipelineEvent::Eta { seconds });
        }
    }

    fn render(&mut self, text: &str) -> Result<SegmentFile, SynthesisError> {
        let unit = self.prosody.render(text, self.engine.as_mut())?;
        let index = self.segments.len();
        let path = self.scratch.join(format!("segment_{index:06}.wav"));
        write_wav(&path, unit.samples(), unit.sample_rate()).map_err(|source| {
            SynthesisError::Persist {
                path: path.clone(),
                source,
            }
        })?;
        Ok(SegmentFile {
            index,
            path,
            duration: unit.duration(),
        })
    }
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 40;
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(LIMIT).collect();
    format!("{}...", head.trim_end())
}

struct Run<'a> {
    job: &'a NarrationJob,
    collaborators: &'a Collaborators,
    cancel: &'a CancellationToken,
    events: &'a EventSink,
    state: PipelineState,
    markers: Vec<ChapterMarker>,
    segments: usize,
    skipped: usize,
}

impl<'a> Run<'a> {
    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {next:?}",
            self.state
        );
        self.state = next;
        self.events.emit(PipelineEvent::State { state: next });
    }

    /// `Ok(true)` when the run was cancelled and the output is partial.
    fn execute(&mut self) -> Result<bool, PipelineError> {
        let job = self.job;
        let events = self.events;
        let settings = &job.settings;

        self.transition(PipelineState::Initializing);
        settings.validate().map_err(InitializationError::from)?;
        let engine = self
            .collaborators
            .launcher
            .launch(settings)
            .map_err(InitializationError::Engine)?;
        let scratch = ScratchDir::create(job.scratch_root.as_deref())
            .map_err(InitializationError::Scratch)?;
        let corrections = Corrections::compile(&settings.pronunciation_corrections);

        let plan = Plan::build(job);
        let total = plan.total();
        self.transition(PipelineState::Synthesizing);
        events.log(
            LogLevel::Info,
            format!(
                "Narrating {total} sentences from {} chapters",
                plan.chapters.len()
            ),
        );
        events.emit(PipelineEvent::Progress { percent: 0 });

        let mut synth = Synthesizer {
            prosody: Prosody::new(settings, &corrections),
            engine,
            scratch: scratch.path(),
            events,
            segments: Vec::new(),
            timeline: Timeline::new(),
            progress: ProgressTracker::new(total),
            skipped: 0,
        };

        let mut cancelled = false;
        'narration: {
            for utterance in &plan.intro {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'narration;
                }
                synth.utterance(utterance);
            }
            for chapter in &plan.chapters {
                events.log(LogLevel::Info, format!("Chapter: {}", chapter.title));
                synth.timeline.open_chapter(chapter.title.as_str());
                for utterance in &chapter.utterances {
                    if self.cancel.is_cancelled() {
                        cancelled = true;
                        break 'narration;
                    }
                    synth.utterance(utterance);
                }
                synth.timeline.close_chapter();
            }
        }

        let Synthesizer {
            engine,
            segments,
            timeline,
            skipped,
            progress,
            ..
        } = synth;
        drop(engine);
        self.markers = timeline.into_markers();
        self.segments = segments.len();
        self.skipped = skipped;
        if cancelled {
            events.log(
                LogLevel::Warn,
                format!(
                    "Cancelled after {} of {} sentences",
                    progress.done(),
                    progress.total()
                ),
            );
        }
        if segments.is_empty() {
            return Err(PipelineError::NoAudio);
        }

        self.transition(PipelineState::Assembling { partial: cancelled });
        events.emit(PipelineEvent::Chapters {
            markers: self.markers.clone(),
        });
        let assembler = Assembler::new(
            &*self.collaborators.encoder,
            self.collaborators.tagger.as_deref(),
        );
        let report = assembler.assemble(
            &segments,
            &self.markers,
            &job.output_path,
            &job.book.tags(),
            scratch.path(),
        )?;
        if let Some(err) = report.tagging_error {
            events.log(
                LogLevel::Warn,
                format!("Audio was written but tagging failed: {err}"),
            );
        }

        scratch.close();
        Ok(cancelled)
    }
}

/// Runs a whole narration on the calling thread. The run-scoped scratch
/// directory is gone by the time this returns.
pub fn run(
    job: &NarrationJob,
    collaborators: &Collaborators,
    cancel: &CancellationToken,
    events: &EventSink,
) -> RunReport {
    let mut run = Run {
        job,
        collaborators,
        cancel,
        events,
        state: PipelineState::Idle,
        markers: Vec::new(),
        segments: 0,
        skipped: 0,
    };

    let outcome = match run.execute() {
        Ok(false) => {
            run.transition(PipelineState::Completed);
            events.log(
                LogLevel::Info,
                format!("Audiobook written to {}", job.output_path.display()),
            );
            events.emit(PipelineEvent::Completed {
                output_path: job.output_path.clone(),
            });
            RunOutcome::Completed {
                output_path: job.output_path.clone(),
            }
        }
        Ok(true) => {
            run.transition(PipelineState::Cancelled);
            events.emit(PipelineEvent::Cancelled {
                partial_output_path: job.output_path.clone(),
            });
            RunOutcome::Cancelled {
                partial_output_path: job.output_path.clone(),
            }
        }
        Err(err) => {
            run.transition(PipelineState::Failed);
            let report = FailureReport::from(&err);
            events.log(LogLevel::Error, format!("Narration failed: {err}"));
            events.emit(PipelineEvent::Failed {
                error: report.clone(),
            });
            RunOutcome::Failed(report)
        }
    };

    RunReport {
        outcome,
        markers: run.markers,
        segments: run.segments,
        skipped: run.skipped,
    }
}

/// A run executing on its own worker thread.
pub struct RunHandle {
    events: Receiver<PipelineEvent>,
    cancel: CancellationToken,
    worker: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Disconnects once the worker has finished.
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn join(self) -> thread::Result<RunReport> {
        self.worker.join()
    }
}

pub fn spawn(job: NarrationJob, collaborators: Collaborators) -> io::Result<RunHandle> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let worker = thread::Builder::new()
        .name("narrator-worker".into())
        .spawn(move || {
            let events = EventSink::new(sender);
            run(&job, &collaborators, &token, &events)
        })?;
    Ok(RunHandle {
        events: receiver,
        cancel,
        worker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assemble::{EncodeJob, EncoderFailure},
        audio::PcmBuffer,
        error::{EngineError, TaggingError},
        synth::SynthesisRequest,
    };
    use parking_lot::Mutex;
    use std::{fs, sync::Arc};
    use tempfile::TempDir;

    const RATE: u32 = 1_000;
    /// 100 samples of speech plus a 0.1 s sentence pause at 1 kHz.
    const UNIT_SECONDS: f64 = 0.2;

    #[derive(Clone, Default)]
    struct EngineScript {
        fail_on: Vec<usize>,
        cancel_after: Option<(usize, CancellationToken)>,
        unavailable: bool,
    }

    struct MockEngine {
        calls: Arc<Mutex<Vec<String>>>,
        script: EngineScript,
    }

    impl SynthesisEngine for MockEngine {
        fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<PcmBuffer, EngineError> {
            let call = {
                let mut calls = self.calls.lock();
                calls.push(request.text.to_string());
                calls.len()
            };
            if let Some((after, token)) = &self.script.cancel_after {
                if call == *after {
                    token.cancel();
                }
            }
            if self.script.fail_on.contains(&call) {
                return Err(EngineError::Other("engine crashed".into()));
            }
            Ok(PcmBuffer::new(vec![0.5; 100], RATE))
        }
    }

    struct MockLauncher {
        calls: Arc<Mutex<Vec<String>>>,
        script: EngineScript,
    }

    impl EngineLauncher for MockLauncher {
        fn launch(&self, _settings: &Settings) -> Result<Box<dyn SynthesisEngine>, EngineError> {
            if self.script.unavailable {
                return Err(EngineError::Unavailable("piper is not installed".into()));
            }
            Ok(Box::new(MockEngine {
                calls: self.calls.clone(),
                script: self.script.clone(),
            }))
        }
    }

    struct MockEncoder {
        manifests: Arc<Mutex<Vec<String>>>,
        chapters: Arc<Mutex<Vec<String>>>,
        fail_with: Option<String>,
    }

    impl AudioEncoder for MockEncoder {
        fn encode(&self, job: &EncodeJob) -> Result<(), EncoderFailure> {
            self.manifests.lock().push(fs::read_to_string(&job.manifest)?);
            if let Some(chapters) = &job.chapters {
                self.chapters.lock().push(fs::read_to_string(chapters)?);
            }
            if let Some(stderr) = &self.fail_with {
                return Err(EncoderFailure::Exited {
                    status: 1,
                    stderr: stderr.clone(),
                });
            }
            fs::write(&job.output, b"m4b")?;
            Ok(())
        }
    }

    struct BrokenTagger;

    impl TagWriter for BrokenTagger {
        fn write_tags(&self, _path: &Path, _tags: &BookTags) -> Result<(), TaggingError> {
            Err(TaggingError::Failed {
                status: 1,
                stderr: "moov atom not found".into(),
            })
        }
    }

    struct Fixture {
        root: TempDir,
        calls: Arc<Mutex<Vec<String>>>,
        manifests: Arc<Mutex<Vec<String>>>,
        chapters: Arc<Mutex<Vec<String>>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                root: TempDir::new().unwrap(),
                calls: Arc::default(),
                manifests: Arc::default(),
                chapters: Arc::default(),
            }
        }

        fn job(&self, chapters: Vec<Chapter>) -> NarrationJob {
            NarrationJob {
                chapters,
                settings: Settings {
                    comma_pause_seconds: 0.0,
                    sentence_pause_seconds: 0.1,
                    ..Settings::default()
                },
                output_path: self.root.path().join("out").join("book.m4b"),
                book: BookInfo::default(),
                skip_toc: false,
                scratch_root: Some(self.root.path().join("scratch")),
            }
        }

        fn collaborators(&self, script: EngineScript) -> Collaborators {
            self.collaborators_with(script, None, None)
        }

        fn collaborators_with(
            &self,
            script: EngineScript,
            encoder_failure: Option<&str>,
            tagger: Option<Box<dyn TagWriter>>,
        ) -> Collaborators {
            Collaborators {
                launcher: Box::new(MockLauncher {
                    calls: self.calls.clone(),
                    script,
                }),
                encoder: Box::new(MockEncoder {
                    manifests: self.manifests.clone(),
                    chapters: self.chapters.clone(),
                    fail_with: encoder_failure.map(str::to_string),
                }),
                tagger,
            }
        }

        fn run(
            &self,
            job: &NarrationJob,
            collaborators: &Collaborators,
            cancel: &CancellationToken,
        ) -> (RunReport, Vec<PipelineEvent>) {
            let (sender, receiver) = crossbeam_channel::unbounded();
            let report = run(job, collaborators, cancel, &EventSink::new(sender));
            (report, receiver.try_iter().collect())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        /// Segment file names of every encoder invocation, in manifest order.
        fn encoded_segments(&self) -> Vec<Vec<String>> {
            self.manifests
                .lock()
                .iter()
                .map(|manifest| {
                    manifest
                        .lines()
                        .filter_map(|line| line.strip_prefix("file '"))
                        .filter_map(|path| path.strip_suffix('\''))
                        .filter_map(|path| Path::new(path).file_name())
                        .map(|name| name.to_string_lossy().into_owned())
                        .collect()
                })
                .collect()
        }

        fn assert_scratch_removed(&self) {
            let scratch = self.root.path().join("scratch");
            if scratch.exists() {
                assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
            }
        }
    }

    fn chapter(order: u32, title: &str, content: &str) -> Chapter {
        Chapter {
            order,
            title: title.into(),
            content: content.into(),
            is_toc: false,
        }
    }

    fn segment_names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("segment_{i:06}.wav")).collect()
    }

    fn warnings(events: &[PipelineEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::Log {
                    level: LogLevel::Warn,
                    message,
                } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn assert_valid_transitions(events: &[PipelineEvent]) {
        let mut current = PipelineState::Idle;
        for event in events {
            if let PipelineEvent::State { state } = event {
                assert!(current.can_transition_to(*state), "{current:?} -> {state:?}");
                current = *state;
            }
        }
        assert!(current.is_terminal(), "run ended in {current:?}");
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn two_chapters_produce_contiguous_markers() {
        let fixture = Fixture::new();
        let job = fixture.job(vec![
            chapter(1, "One", "Only sentence."),
            chapter(2, "Two", "First sentence. Second sentence."),
        ]);
        let collaborators = fixture.collaborators(EngineScript::default());

        let (report, events) = fixture.run(&job, &collaborators, &CancellationToken::new());

        assert_eq!(
            report.outcome,
            RunOutcome::Completed {
                output_path: job.output_path.clone()
            }
        );
        assert_eq!(
            fixture.calls(),
            vec!["Only sentence.", "First sentence.", "Second sentence."]
        );
        assert_eq!(report.segments, 3);
        assert_eq!(report.markers.len(), 2);
        assert_eq!(report.markers[0].start_seconds, 0.0);
        assert_close(report.markers[0].end_seconds, UNIT_SECONDS);
        assert_eq!(report.markers[0].end_seconds, report.markers[1].start_seconds);
        assert_close(report.markers[1].end_seconds, 3.0 * UNIT_SECONDS);
        assert_eq!(fixture.encoded_segments(), vec![segment_names(3)]);
        assert!(fixture.chapters.lock()[0].contains("START=200\nEND=600\ntitle=Two"));
        assert!(job.output_path.exists());
        fixture.assert_scratch_removed();
        assert_valid_transitions(&events);

        let percents: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::Progress { percent } => Some(*percent),
                _ => None,
            })
            .collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&100));
        assert!(matches!(events.last(), Some(PipelineEvent::Completed { .. })));
    }

    #[test]
    fn failed_sentence_is_skipped_not_fatal() {
        let fixture = Fixture::new();
        let job = fixture.job(vec![chapter(
            1,
            "Only",
            "One here. Two here. Three here. Four here. Five here.",
        )]);
        let collaborators = fixture.collaborators(EngineScript {
            fail_on: vec![3],
            ..EngineScript::default()
        });

        let (report, events) = fixture.run(&job, &collaborators, &CancellationToken::new());

        assert!(matches!(report.outcome, RunOutcome::Completed { .. }));
        assert_eq!(report.segments, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(fixture.encoded_segments(), vec![segment_names(4)]);
        let warnings = warnings(&events);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Three here."), "{}", warnings[0]);
        assert!(warnings[0].contains("engine crashed"));
        assert!(!events
            .iter()
            .any(|event| matches!(event, PipelineEvent::Failed { .. })));
        assert_close(report.markers[0].end_seconds, 4.0 * UNIT_SECONDS);
    }

    #[test]
    fn cancellation_keeps_finished_sentences() {
        let fixture = Fixture::new();
        let cancel = CancellationToken::new();
        let job = fixture.job(vec![
            chapter(1, "One", "Alpha. Beta. Gamma."),
            chapter(2, "Two", "Delta. Epsilon."),
        ]);
        let collaborators = fixture.collaborators(EngineScript {
            cancel_after: Some((2, cancel.clone())),
            ..EngineScript::default()
        });

        let (report, events) = fixture.run(&job, &collaborators, &cancel);

        assert_eq!(
            report.outcome,
            RunOutcome::Cancelled {
                partial_output_path: job.output_path.clone()
            }
        );
        assert_eq!(fixture.calls(), vec!["Alpha.", "Beta."]);
        assert_eq!(fixture.encoded_segments(), vec![segment_names(2)]);
        assert_eq!(report.markers.len(), 1);
        assert_close(report.markers[0].end_seconds, 2.0 * UNIT_SECONDS);
        assert!(events.contains(&PipelineEvent::State {
            state: PipelineState::Assembling { partial: true }
        }));
        assert!(matches!(events.last(), Some(PipelineEvent::Cancelled { .. })));
        assert_valid_transitions(&events);
        fixture.assert_scratch_removed();
    }

    #[test]
    fn cancelled_before_any_audio_fails() {
        let fixture = Fixture::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let job = fixture.job(vec![chapter(1, "One", "Alpha.")]);
        let collaborators = fixture.collaborators(EngineScript::default());

        let (report, _) = fixture.run(&job, &collaborators, &cancel);

        assert!(matches!(
            report.outcome,
            RunOutcome::Failed(ref failure) if failure.code == "NO_AUDIO"
        ));
        assert!(fixture.calls().is_empty());
        assert!(fixture.manifests.lock().is_empty());
    }

    #[test]
    fn unavailable_engine_fails_initialization() {
        let fixture = Fixture::new();
        let job = fixture.job(vec![chapter(1, "One", "Alpha.")]);
        let collaborators = fixture.collaborators(EngineScript {
            unavailable: true,
            ..EngineScript::default()
        });

        let (report, events) = fixture.run(&job, &collaborators, &CancellationToken::new());

        match &report.outcome {
            RunOutcome::Failed(failure) => {
                assert_eq!(failure.code, "INITIALIZATION_FAILED");
                assert!(failure
                    .details
                    .as_deref()
                    .is_some_and(|details| details.contains("piper is not installed")));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let states: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::State { state } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![PipelineState::Initializing, PipelineState::Failed]
        );
        assert!(!job.output_path.exists());
        assert!(fixture.manifests.lock().is_empty());
    }

    #[test]
    fn invalid_settings_fail_initialization() {
        let fixture = Fixture::new();
        let mut job = fixture.job(vec![chapter(1, "One", "Alpha.")]);
        job.settings.speed = -1.0;
        let collaborators = fixture.collaborators(EngineScript::default());

        let (report, _) = fixture.run(&job, &collaborators, &CancellationToken::new());
        assert!(matches!(
            report.outcome,
            RunOutcome::Failed(ref failure) if failure.code == "INITIALIZATION_FAILED"
        ));
    }

    #[test]
    fn no_audio_skips_assembly() {
        let fixture = Fixture::new();
        let job = fixture.job(vec![chapter(1, "One", "Alpha. Beta.")]);
        let collaborators = fixture.collaborators(EngineScript {
            fail_on: vec![1, 2],
            ..EngineScript::default()
        });

        let (report, events) = fixture.run(&job, &collaborators, &CancellationToken::new());

        match &report.outcome {
            RunOutcome::Failed(failure) => {
                assert_eq!(failure.code, "NO_AUDIO");
                assert_eq!(failure.message, "No audio generated");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(report.markers.is_empty());
        assert!(fixture.manifests.lock().is_empty());
        assert_valid_transitions(&events);
        fixture.assert_scratch_removed();
    }

    #[test]
    fn encoder_failure_is_fatal_with_its_stderr() {
        let fixture = Fixture::new();
        let job = fixture.job(vec![chapter(1, "One", "Alpha.")]);
        let collaborators = fixture.collaborators_with(
            EngineScript::default(),
            Some("Invalid data found when processing input"),
            None,
        );

        let (report, events) = fixture.run(&job, &collaborators, &CancellationToken::new());

        match &report.outcome {
            RunOutcome::Failed(failure) => {
                assert_eq!(failure.code, "ASSEMBLY_FAILED");
                assert_eq!(
                    failure.details.as_deref(),
                    Some("Invalid data found when processing input")
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_valid_transitions(&events);
        fixture.assert_scratch_removed();
    }

    #[test]
    fn tagging_failure_only_warns() {
        let fixture = Fixture::new();
        let job = fixture.job(vec![chapter(1, "One", "Alpha.")]);
        let collaborators =
            fixture.collaborators_with(EngineScript::default(), None, Some(Box::new(BrokenTagger)));

        let (report, events) = fixture.run(&job, &collaborators, &CancellationToken::new());

        assert!(matches!(report.outcome, RunOutcome::Completed { .. }));
        let warnings = warnings(&events);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("moov atom not found"));
    }

    #[test]
    fn intro_precedes_chapters_without_a_marker() {
        let fixture = Fixture::new();
        let mut job = fixture.job(vec![chapter(1, "One", "Call me Ishmael.")]);
        job.book = BookInfo {
            title: Some("Moby Dick".into()),
            author: None,
            cover: None,
        };
        let collaborators = fixture.collaborators(EngineScript::default());

        let (report, _) = fixture.run(&job, &collaborators, &CancellationToken::new());

        let calls = fixture.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with(INTRO_PREFIX));
        assert!(calls[0].contains("Moby Dick"));
        assert!(calls[0].contains(UNKNOWN_AUTHOR));
        assert_eq!(calls[1], "Call me Ishmael.");
        assert_eq!(report.markers.len(), 1);
        assert_close(report.markers[0].start_seconds, UNIT_SECONDS);
        assert_close(report.markers[0].end_seconds, 2.0 * UNIT_SECONDS);
    }

    #[test]
    fn chapters_run_in_order_and_toc_can_be_skipped() {
        let fixture = Fixture::new();
        let mut toc = chapter(0, "Contents", "Chapter one. Chapter two.");
        toc.is_toc = true;
        let mut job = fixture.job(vec![
            chapter(2, "Second", "Later."),
            toc,
            chapter(1, "First", "Sooner."),
        ]);
        job.skip_toc = true;
        let collaborators = fixture.collaborators(EngineScript::default());

        let (report, _) = fixture.run(&job, &collaborators, &CancellationToken::new());

        assert_eq!(fixture.calls(), vec!["Sooner.", "Later."]);
        let titles: Vec<_> = report.markers.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn spawned_run_streams_events_until_done() {
        let fixture = Fixture::new();
        let job = fixture.job(vec![chapter(1, "One", "Alpha. Beta.")]);
        let handle = spawn(job, fixture.collaborators(EngineScript::default())).unwrap();

        let events: Vec<PipelineEvent> = handle.events().iter().collect();
        let report = handle.join().unwrap();

        assert!(matches!(report.outcome, RunOutcome::Completed { .. }));
        assert!(matches!(events.last(), Some(PipelineEvent::Completed { .. })));
        assert!(events
            .iter()
            .any(|event| matches!(event, PipelineEvent::Chapters { markers } if markers.len() == 1)));
    }

    #[test]
    fn intro_requires_a_title() {
        assert_eq!(BookInfo::default().intro_text(), None);
        let book = BookInfo {
            title: Some("Dracula".into()),
            author: Some("Bram Stoker".into()),
            cover: None,
        };
        assert_eq!(
            book.intro_text().unwrap(),
            "The following is a machine-generated audiobook. Dracula. by Bram Stoker."
        );
    }
}
