//! Replay CLI: feed a recorded snapshot log through the engine and
//! export the transcript.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use capscribe::engine::{CaptionSession, SessionConfig};
use capscribe::render::CollectingSink;
use capscribe::settings::{self, CaptionSettings};
use capscribe::utterance::Snapshot;

/// Replay a live-caption snapshot log and export the transcript.
///
/// The input is JSON lines, one snapshot per line:
///
///   {"text":"Hello there","speaker_hint":"Alice","observed_at":"2024-05-01T10:00:00+09:00"}
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Snapshot log to replay (JSON lines)
    input: PathBuf,

    /// Write the transcript here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Silence window in milliseconds (overrides settings)
    #[arg(long)]
    silence_ms: Option<u64>,

    /// Settings file to load (created with defaults if missing)
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let loaded = match &args.settings {
        Some(path) => settings::load_or_create(path)?,
        None => CaptionSettings::default(),
    };

    let mut config = SessionConfig::from_settings(&loaded);
    if let Some(ms) = args.silence_ms {
        config.silence_window_ms = ms;
    }

    let file = fs::File::open(&args.input)
        .with_context(|| format!("failed to open snapshot log {}", args.input.display()))?;

    let mut session = CaptionSession::new(config, Box::new(CollectingSink::new()));

    let mut fed = 0usize;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("failed to read snapshot log")?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Snapshot>(&line) {
            Ok(snapshot) => {
                // Let the silence window play out on the log's own clock
                // before feeding the next snapshot.
                session.tick(snapshot.observed_at);
                session.on_snapshot(snapshot);
                fed += 1;
            }
            Err(e) => warn!("Skipping malformed snapshot on line {}: {}", line_no + 1, e),
        }
    }

    session.stop(true);
    info!(
        "Replayed {} snapshots into {} utterances",
        fed,
        session.store().len()
    );

    let transcript = session.export();
    let destination = args.output.or(loaded.transcript_path);
    match destination {
        Some(path) => {
            fs::write(&path, transcript.as_bytes())
                .with_context(|| format!("failed to write transcript to {}", path.display()))?;
            info!("Transcript written to {}", path.display());
        }
        None => println!("{}", transcript),
    }

    Ok(())
}
