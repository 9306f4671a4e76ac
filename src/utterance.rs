//! Core data types for the caption stream: snapshots in, utterances out.

use std::collections::HashSet;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One observed state of the live-caption region at a point in time.
///
/// Snapshots are transient: produced once per sampling tick, consumed
/// immediately by the session, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Raw text content of the caption region, artifacts and all.
    pub text: String,

    /// Speaker label when the source can attribute the text (e.g. the
    /// name shown next to the caption row).
    #[serde(default)]
    pub speaker_hint: Option<String>,

    /// Externally supplied message id, preferred over a synthetic one.
    #[serde(default)]
    pub message_id: Option<String>,

    /// Wall-clock time the snapshot was taken.
    pub observed_at: DateTime<Local>,
}

/// Lifecycle state of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtteranceState {
    /// Still accumulating text; at most one utterance is open at a time.
    Open,
    /// Text is frozen and the utterance lives in the store.
    Finalized,
}

/// One logical unit of finalized speech text, attributed to a speaker
/// and start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Stable identifier, assigned at creation.
    pub id: String,

    /// Speaker label, empty when unknown. Fixed at creation; a speaker
    /// change always starts a new utterance instead.
    pub speaker: String,

    /// Best-known content. Mutable while `Open`, immutable once
    /// `Finalized`.
    pub text: String,

    pub started_at: DateTime<Local>,
    pub last_updated_at: DateTime<Local>,

    pub state: UtteranceState,
}

impl Utterance {
    pub fn is_open(&self) -> bool {
        self.state == UtteranceState::Open
    }
}

/// Format a timestamp the way transcript lines show it.
pub fn format_clock_time(timestamp: DateTime<Local>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

/// Issues utterance ids, preferring externally supplied message ids and
/// falling back to clock-derived synthetic ones (`caption-<millis>`).
///
/// Every issued id is remembered, and a repeat of any base id — a
/// source reusing a message id, or snapshots landing on the same
/// millisecond — gets a counter suffix, so ids stay unique for the
/// lifetime of the generator.
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: HashSet<String>,
}

impl IdGenerator {
    pub fn next(&mut self, observed_at: DateTime<Local>, message_id: Option<&str>) -> String {
        let base = match message_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("caption-{}", observed_at.timestamp_millis()),
        };

        let id = self.disambiguate(base);
        self.issued.insert(id.clone());
        id
    }

    fn disambiguate(&self, base: String) -> String {
        if !self.issued.contains(&base) {
            return base;
        }

        let mut n = 1u32;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.issued.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
