//! Append-only store for finalized utterances.

use log::debug;

use crate::utterance::{format_clock_time, Utterance, UtteranceState};

/// Ordered collection of finalized utterances.
///
/// Entries are only ever appended; the sequence order equals
/// finalization order. Nothing is removed or reordered.
#[derive(Debug, Default)]
pub struct UtteranceStore {
    entries: Vec<Utterance>,
}

impl UtteranceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized utterance.
    pub fn append(&mut self, utterance: Utterance) {
        debug_assert_eq!(utterance.state, UtteranceState::Finalized);
        debug!(
            "Store: appended utterance '{}' ({} chars)",
            utterance.id,
            utterance.text.chars().count()
        );
        self.entries.push(utterance);
    }

    /// Read-only view of all finalized utterances, in finalization order.
    pub fn all(&self) -> &[Utterance] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the transcript as `[<time>] <speaker>: <text>` lines.
    ///
    /// The speaker segment and its trailing colon-space are omitted when
    /// the speaker is empty.
    pub fn export(&self) -> String {
        self.entries
            .iter()
            .map(|u| {
                let time = format_clock_time(u.started_at);
                if u.speaker.is_empty() {
                    format!("[{}] {}", time, u.text)
                } else {
                    format!("[{}] {}: {}", time, u.speaker, u.text)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
