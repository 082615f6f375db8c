use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use narrator::{
    dict::DictionaryEntry,
    load_chapters,
    pipeline::{self, BookInfo, NarrationJob, PipelineEvent, RunOutcome},
    settings::Settings,
    state::{AppState, RuntimeConfig},
    text,
    util::logging,
};

/// Turns book chapters into a single narrated audiobook with chapter marks.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Narrate a chapters file into an audiobook
    Narrate(NarrateCommand),

    /// List installed voices
    Voices {
        /// Print one JSON object per voice
        #[arg(long)]
        json: bool,

        /// Only voices reading this language, e.g. "en" or "es_ES"
        #[arg(long)]
        language: Option<String>,
    },

    /// Print the normalized utterances of a chapters file
    Segment(SegmentCommand),

    /// Manage the pronunciation dictionary
    #[command(subcommand)]
    Dictionary(DictionaryCommand),
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// JSON settings file; flags below override its values
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Voice id (model file stem)
    #[arg(long)]
    voice: Option<String>,

    /// Speaking rate, 1.0 is normal
    #[arg(long)]
    speed: Option<f32>,

    /// Pause after each sentence, in seconds
    #[arg(long)]
    sentence_pause: Option<f64>,

    /// Pause after each comma in seconds; 0 lets the voice decide
    #[arg(long)]
    comma_pause: Option<f64>,

    /// Longest utterance sent to the voice, in characters
    #[arg(long)]
    max_chars: Option<usize>,

    /// Language code used for sentence boundaries
    #[arg(long)]
    language: Option<String>,
}

impl SettingsArgs {
    fn resolve(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        };
        if let Some(voice) = &self.voice {
            settings.voice_id = voice.clone();
        }
        if let Some(speed) = self.speed {
            settings.speed = speed;
        }
        if let Some(pause) = self.sentence_pause {
            settings.sentence_pause_seconds = pause;
        }
        if let Some(pause) = self.comma_pause {
            settings.comma_pause_seconds = pause;
        }
        if let Some(max_chars) = self.max_chars {
            settings.max_chars = max_chars;
        }
        if let Some(language) = &self.language {
            settings.language = language.clone();
        }
        settings.validate().context("invalid settings")?;
        Ok(settings)
    }
}

#[derive(Parser, Debug)]
struct NarrateCommand {
    /// Chapters as a JSON array, or a plain text file
    chapters: PathBuf,

    /// Audiobook to write
    #[arg(short, long, default_value = "audiobook.m4b")]
    output: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Book title; enables the spoken introduction
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    author: Option<String>,

    /// Cover image embedded in the audiobook
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Leave out chapters flagged as table of contents
    #[arg(long)]
    skip_toc: bool,

    /// Delete the output when the run is cancelled
    #[arg(long)]
    discard_partial: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct SegmentCommand {
    chapters: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    #[arg(long)]
    skip_toc: bool,
}

#[derive(Subcommand, Debug)]
enum DictionaryCommand {
    /// Show every entry
    List,

    /// Add or replace a pronunciation
    Add { word: String, replacement: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RuntimeConfig::from_env();
    logging::init(&config.log_dir).context("failed to initialise logging")?;
    let state = AppState::initialise(config)?;

    match cli.command {
        Commands::Narrate(command) => narrate(&state, command),
        Commands::Voices { json, language } => voices(&state, json, language.as_deref()),
        Commands::Segment(command) => segment(command),
        Commands::Dictionary(command) => dictionary(&state, command),
    }
}

fn narrate(state: &AppState, command: NarrateCommand) -> Result<()> {
    let chapters = load_chapters(&command.chapters)?;
    let settings = state.effective_settings(command.settings.resolve()?);
    info!(
        "Narrating {} chapters from {} with voice {}",
        chapters.len(),
        command.chapters.display(),
        settings.voice_id
    );

    let job = NarrationJob {
        chapters,
        settings,
        output_path: command.output.clone(),
        book: BookInfo {
            title: command.title,
            author: command.author,
            cover: command.cover,
        },
        skip_toc: command.skip_toc,
        scratch_root: None,
    };
    let handle = pipeline::spawn(job, state.collaborators()).context("failed to start worker")?;

    let cancel = handle.cancel_token();
    thread::spawn(move || {
        let mut line = String::new();
        if matches!(io::stdin().lock().read_line(&mut line), Ok(n) if n > 0) {
            cancel.cancel();
        }
    });
    if !command.json {
        eprintln!("Press Enter to stop after the current sentence.");
    }

    let mut last_percent = None;
    for event in handle.events().iter() {
        if command.json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match event {
            PipelineEvent::Progress { percent } if last_percent != Some(percent) => {
                last_percent = Some(percent);
                println!("{percent:>3}%");
            }
            PipelineEvent::Eta { seconds } if seconds > 0 => {
                println!("     about {} left", format_eta(seconds));
            }
            _ => {}
        }
    }

    let report = match handle.join() {
        Ok(report) => report,
        Err(_) => bail!("narration worker panicked"),
    };
    match report.outcome {
        RunOutcome::Completed { output_path } => {
            println!("Wrote {}", output_path.display());
            Ok(())
        }
        RunOutcome::Cancelled {
            partial_output_path,
        } => {
            if command.discard_partial {
                std::fs::remove_file(&partial_output_path).with_context(|| {
                    format!("failed to remove {}", partial_output_path.display())
                })?;
                println!("Cancelled; partial audiobook discarded");
            } else {
                println!(
                    "Cancelled; partial audiobook kept at {}",
                    partial_output_path.display()
                );
            }
            Ok(())
        }
        RunOutcome::Failed(failure) => match failure.details {
            Some(details) => bail!("{} ({}): {details}", failure.message, failure.code),
            None => bail!("{} ({})", failure.message, failure.code),
        },
    }
}

fn format_eta(seconds: u64) -> String {
    match (seconds / 3600, (seconds % 3600) / 60, seconds % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, _) => format!("{h}h {m:02}m"),
    }
}

fn voices(state: &AppState, json: bool, language: Option<&str>) -> Result<()> {
    let voices = match language {
        Some(language) => state.voices.for_language(language),
        None => state.voices.list(),
    };
    if voices.is_empty() {
        warn!(
            "No voices installed under {}",
            state.voices.base_dir().display()
        );
    }
    for voice in voices {
        if json {
            println!("{}", serde_json::to_string(&voice)?);
        } else {
            println!("{:<32} {}", voice.id, voice.label);
        }
    }
    Ok(())
}

fn segment(command: SegmentCommand) -> Result<()> {
    let settings = command.settings.resolve()?;
    let mut chapters = load_chapters(&command.chapters)?;
    chapters.retain(|chapter| !(command.skip_toc && chapter.is_toc));
    chapters.sort_by_key(|chapter| chapter.order);
    for chapter in chapters {
        println!("## {}", chapter.title);
        for utterance in text::utterances(&chapter.content, &settings) {
            println!("{utterance}");
        }
        println!();
    }
    Ok(())
}

fn dictionary(state: &AppState, command: DictionaryCommand) -> Result<()> {
    match command {
        DictionaryCommand::List => {
            for entry in state.dictionary.entries() {
                println!("{} -> {}", entry.word, entry.replacement);
            }
        }
        DictionaryCommand::Add { word, replacement } => {
            state
                .dictionary
                .upsert(DictionaryEntry { word, replacement })
                .with_context(|| {
                    format!("failed to update {}", state.dictionary.path().display())
                })?;
        }
    }
    Ok(())
}
