mod cursor;

use std::path::{Path, PathBuf};

use beat_timeline_core::{
    format_clock, reduce, AppConfig, AudioEngine, AudioSource, BeatEvent, EnvelopeStatus,
    SourceId,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cursor::BeatCursor;

const THUMBNAIL_COUNT: usize = 5;

fn main() -> beat_timeline_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            columns,
            tick_rate,
        } => run_analyze(&input, config.as_deref(), columns, tick_rate),
        Commands::Envelope {
            input,
            config,
            columns,
        } => run_envelope(&input, config.as_deref(), columns),
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeReport {
    input: String,
    duration_seconds: f64,
    duration: String,
    total_beats: u64,
    beats: Vec<BeatEvent>,
    thumbnail: usize,
    cursor_beats: u64,
    flash_ticks: u64,
    envelope_columns: usize,
    envelope_peak: Option<f32>,
}

fn run_analyze(
    input: &Path,
    config: Option<&Path>,
    columns: Option<usize>,
    tick_rate: Option<f64>,
) -> beat_timeline_core::Result<()> {
    let config = apply_overrides(load_config(config)?, columns, tick_rate)?;

    tracing::info!(?input, "decoding source");
    let source = AudioSource::open(input)?;
    let duration = source.duration_seconds();
    let interval = config.analysis.tick_interval_seconds();

    let engine = AudioEngine::new(config.analysis)?;
    let id = engine.load_source(&source)?;
    engine.play()?;

    let mut cursor = BeatCursor::new(THUMBNAIL_COUNT);
    let playback = simulate_playback(&engine, id, duration, interval, &mut cursor)?;

    let envelope = match engine.wait_for_envelope()? {
        EnvelopeStatus::Ready(envelope) => Some(envelope),
        status => {
            tracing::warn!(?status, "envelope unavailable");
            None
        }
    };

    let report = AnalyzeReport {
        input: input.display().to_string(),
        duration_seconds: duration,
        duration: format_clock(duration),
        total_beats: engine.total_beats()?,
        beats: playback.beats,
        thumbnail: cursor.slot(),
        cursor_beats: cursor.beats_seen(),
        flash_ticks: playback.flash_ticks,
        envelope_columns: envelope.as_ref().map_or(0, |envelope| envelope.len()),
        envelope_peak: envelope.as_ref().map(|envelope| envelope.peak()),
    };
    tracing::info!(
        beats = report.total_beats,
        duration = %report.duration,
        "analysis finished"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_envelope(
    input: &Path,
    config: Option<&Path>,
    columns: Option<usize>,
) -> beat_timeline_core::Result<()> {
    let config = apply_overrides(load_config(config)?, columns, None)?;

    let source = AudioSource::open(input)?;
    let envelope = reduce(source.samples(), config.analysis.envelope_column_count);
    tracing::info!(columns = envelope.len(), peak = envelope.peak(), "envelope reduced");

    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

/// Beats collected during one simulated playback, plus the number of ticks
/// during which the beat indicator was lit.
#[derive(Debug, Default)]
struct Playback {
    beats: Vec<BeatEvent>,
    flash_ticks: u64,
}

/// Drives the engine at the configured tick rate from zero to `duration`,
/// as the host scheduler would, then reports end of media.
fn simulate_playback(
    engine: &AudioEngine,
    id: SourceId,
    duration: f64,
    interval: f64,
    cursor: &mut BeatCursor,
) -> beat_timeline_core::Result<Playback> {
    let mut playback = Playback::default();
    let mut tick: u64 = 0;
    loop {
        let now = tick as f64 * interval;
        if now >= duration {
            break;
        }

        engine.tick(id, now)?;
        if let Some(event) = engine.analyze_window(id, now)? {
            cursor.advance(&event);
            tracing::info!(
                beat = event.sequence_number,
                at = %format_clock(event.timestamp_seconds),
                seconds = event.timestamp_seconds,
                thumbnail = cursor.slot() + 1,
                "beat detected"
            );
            playback.beats.push(event);
        }
        if cursor.is_flashing(now) {
            tracing::debug!(at = now, "beat indicator lit");
            playback.flash_ticks += 1;
        }
        tick += 1;
    }
    engine.end_of_media(id)?;
    Ok(playback)
}

/// Applies command line overrides and validates the result.
fn apply_overrides(
    mut config: AppConfig,
    columns: Option<usize>,
    tick_rate: Option<f64>,
) -> beat_timeline_core::Result<AppConfig> {
    if let Some(columns) = columns {
        config.analysis.envelope_column_count = columns;
    }
    if let Some(tick_rate) = tick_rate {
        config.analysis.tick_rate_hz = tick_rate;
    }
    config.analysis.validate()?;
    Ok(config)
}

fn load_config(path: Option<&Path>) -> beat_timeline_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat detection and waveform envelopes for audio tracks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a track through the beat detector and report every beat.
    Analyze {
        /// Path to the audio file that should be analysed.
        input: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Width of the waveform envelope in columns.
        #[arg(long)]
        columns: Option<usize>,
        /// Analysis ticks per second of simulated playback.
        #[arg(long)]
        tick_rate: Option<f64>,
    },
    /// Print the min/max envelope of a track as JSON.
    Envelope {
        /// Path to the audio file that should be reduced.
        input: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Width of the envelope in columns.
        #[arg(long)]
        columns: Option<usize>,
    },
}
