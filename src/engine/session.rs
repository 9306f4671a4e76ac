//! Utterance lifecycle management.
//!
//! [`CaptionSession`] owns the single active slot: at most one open
//! utterance at any time. Snapshots come in, get normalized and
//! classified, and either grow the open utterance, split off a new one,
//! or are ignored. Finalized utterances are appended to the store and
//! never touched again.

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::classifier::{classify, Verdict};
use crate::normalizer::normalize;
use crate::render::{CaptionEvent, RenderAdapter, RenderSink};
use crate::settings::CaptionSettings;
use crate::store::UtteranceStore;
use crate::utterance::{IdGenerator, Snapshot, Utterance, UtteranceState};

use super::silence::SilenceTimer;

/// Configuration for a caption session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet window after which an unchanged open utterance is
    /// forcibly finalized.
    pub silence_window_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            silence_window_ms: 2000,
        }
    }
}

impl SessionConfig {
    /// Load config from persisted settings.
    pub fn from_settings(settings: &CaptionSettings) -> Self {
        Self {
            silence_window_ms: settings.silence_window_ms,
        }
    }
}

/// What to do with a non-duplicate snapshot.
enum SlotAction {
    Open,
    Update,
    Split,
}

/// The caption stream stabilization engine for one monitored
/// conversation.
///
/// Lifecycle: create, feed snapshots (and ticks), stop. The session
/// never fails on snapshot content; malformed input is a no-op.
pub struct CaptionSession {
    config: SessionConfig,

    /// The single active slot.
    slot: Option<Utterance>,

    /// Last accepted normalized text. Survives finalization so a stale
    /// repeat of already-finalized text does not reopen a slot.
    last_text: String,

    timer: SilenceTimer,
    store: UtteranceStore,
    adapter: RenderAdapter,
    ids: IdGenerator,
    stopped: bool,
}

impl CaptionSession {
    pub fn new(config: SessionConfig, sink: Box<dyn RenderSink>) -> Self {
        Self {
            config,
            slot: None,
            last_text: String::new(),
            timer: SilenceTimer::new(),
            store: UtteranceStore::new(),
            adapter: RenderAdapter::new(sink),
            ids: IdGenerator::default(),
            stopped: false,
        }
    }

    /// Entry point for the snapshot source. Processes one observed
    /// state of the caption region.
    pub fn on_snapshot(&mut self, snapshot: Snapshot) {
        if self.stopped {
            debug!("Session stopped, dropping snapshot");
            return;
        }

        let text = normalize(&snapshot.text);
        if text.is_empty() {
            return;
        }

        // Identical content never re-triggers rendering or timers.
        if text == self.last_text {
            return;
        }

        let speaker = snapshot
            .speaker_hint
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string();

        let action = match self.slot.as_ref() {
            None => SlotAction::Open,
            Some(open) => {
                // A speaker change always starts a new utterance,
                // whatever the text looks like.
                if !speaker.is_empty() && speaker != open.speaker {
                    SlotAction::Split
                } else {
                    match classify(&open.text, &text) {
                        Verdict::Continuation => SlotAction::Update,
                        Verdict::NewSentence => SlotAction::Split,
                    }
                }
            }
        };

        match action {
            SlotAction::Open => self.open_utterance(text, speaker, &snapshot),
            SlotAction::Update => self.update_open(text, snapshot.observed_at),
            SlotAction::Split => {
                self.finalize_open();
                self.open_utterance(text, speaker, &snapshot);
            }
        }
    }

    /// Check the silence deadline against `now`, finalizing the open
    /// utterance if the quiet window elapsed. Returns true if an
    /// utterance was finalized.
    pub fn tick(&mut self, now: DateTime<Local>) -> bool {
        if self.timer.take_expired(now) && self.slot.is_some() {
            debug!("Silence window elapsed, finalizing open utterance");
            self.finalize_open();
            true
        } else {
            false
        }
    }

    /// Tear down the session. With `flush`, any open utterance is
    /// finalized into the store; without, it is discarded.
    pub fn stop(&mut self, flush: bool) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.timer.cancel();

        if flush {
            self.finalize_open();
        } else if let Some(discarded) = self.slot.take() {
            info!("Discarding open utterance '{}' on stop", discarded.id);
        }

        info!(
            "Caption session stopped with {} finalized utterances",
            self.store.len()
        );
    }

    fn open_utterance(&mut self, text: String, speaker: String, snapshot: &Snapshot) {
        let id = self
            .ids
            .next(snapshot.observed_at, snapshot.message_id.as_deref());

        info!("Opening utterance '{}' (speaker '{}')", id, speaker);

        self.last_text = text.clone();
        self.adapter.handle(&CaptionEvent::Created {
            id: id.clone(),
            speaker: speaker.clone(),
            timestamp: snapshot.observed_at,
            text: text.clone(),
        });
        self.timer
            .arm(snapshot.observed_at, self.config.silence_window_ms);

        self.slot = Some(Utterance {
            id,
            speaker,
            text,
            started_at: snapshot.observed_at,
            last_updated_at: snapshot.observed_at,
            state: UtteranceState::Open,
        });
    }

    fn update_open(&mut self, text: String, observed_at: DateTime<Local>) {
        let id = match self.slot.as_mut() {
            Some(open) => {
                open.text = text.clone();
                open.last_updated_at = observed_at;
                open.id.clone()
            }
            None => return,
        };

        self.last_text = text.clone();
        self.adapter.handle(&CaptionEvent::Updated { id, text });
        self.timer.arm(observed_at, self.config.silence_window_ms);
    }

    fn finalize_open(&mut self) {
        self.timer.cancel();

        if let Some(mut utterance) = self.slot.take() {
            utterance.state = UtteranceState::Finalized;
            info!(
                "Finalized utterance '{}': '{}'",
                utterance.id, utterance.text
            );
            self.adapter.handle(&CaptionEvent::Finalized {
                id: utterance.id.clone(),
                text: utterance.text.clone(),
            });
            self.store.append(utterance);
        }
    }

    /// Finalized utterances so far.
    pub fn store(&self) -> &UtteranceStore {
        &self.store
    }

    /// Newline-joined transcript of all finalized utterances.
    pub fn export(&self) -> String {
        self.store.export()
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_some()
    }

    /// Text of the open utterance, if any.
    pub fn open_text(&self) -> Option<&str> {
        self.slot.as_ref().map(|u| u.text.as_str())
    }

    /// Pending silence deadline, if an utterance is open.
    pub fn silence_deadline(&self) -> Option<DateTime<Local>> {
        self.timer.deadline()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{CollectingSink, RenderError};
    use chrono::{Duration, TimeZone};
    use std::sync::{Arc, Mutex};

    fn base() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn snap_at(text: &str, offset_ms: i64) -> Snapshot {
        Snapshot {
            text: text.to_string(),
            speaker_hint: None,
            message_id: None,
            observed_at: base() + Duration::milliseconds(offset_ms),
        }
    }

    fn snap_from(speaker: &str, text: &str, offset_ms: i64) -> Snapshot {
        Snapshot {
            speaker_hint: Some(speaker.to_string()),
            ..snap_at(text, offset_ms)
        }
    }

    fn session() -> (CaptionSession, CollectingSink) {
        let sink = CollectingSink::new();
        let session = CaptionSession::new(SessionConfig::default(), Box::new(sink.clone()));
        (session, sink)
    }

    /// Sink that records every call, for event-count assertions.
    #[derive(Default, Clone)]
    struct CallLog {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl CallLog {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RenderSink for CallLog {
        fn create(
            &mut self,
            _id: &str,
            _speaker: &str,
            _timestamp: DateTime<Local>,
            text: &str,
        ) -> Result<(), RenderError> {
            self.calls.lock().unwrap().push(format!("create {}", text));
            Ok(())
        }

        fn update(&mut self, _id: &str, text: &str) -> Result<(), RenderError> {
            self.calls.lock().unwrap().push(format!("update {}", text));
            Ok(())
        }
    }

    /// Sink that always fails.
    struct BrokenSink;

    impl RenderSink for BrokenSink {
        fn create(
            &mut self,
            _id: &str,
            _speaker: &str,
            _timestamp: DateTime<Local>,
            _text: &str,
        ) -> Result<(), RenderError> {
            Err(RenderError::Closed)
        }

        fn update(&mut self, _id: &str, _text: &str) -> Result<(), RenderError> {
            Err(RenderError::Closed)
        }
    }

    #[test]
    fn test_first_snapshot_opens_utterance() {
        let (mut session, sink) = session();

        session.on_snapshot(snap_at("Hello", 0));

        assert!(session.is_open());
        assert_eq!(session.open_text(), Some("Hello"));
        assert!(session.store().is_empty());
        assert_eq!(sink.rows().len(), 1);
    }

    #[test]
    fn test_continuation_updates_in_place() {
        let (mut session, sink) = session();

        session.on_snapshot(snap_at("Hello", 0));
        session.on_snapshot(snap_at("Hello there", 500));

        assert_eq!(session.open_text(), Some("Hello there"));
        assert!(session.store().is_empty());
        // Still one row, with the grown text.
        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "Hello there");
    }

    #[test]
    fn test_dedup_identical_text_is_noop() {
        let log = CallLog::default();
        let mut session =
            CaptionSession::new(SessionConfig::default(), Box::new(log.clone()));

        session.on_snapshot(snap_at("Hello", 0));
        let deadline = session.silence_deadline();

        session.on_snapshot(snap_at("Hello", 700));
        session.on_snapshot(snap_at("  Hello  ", 900));

        assert_eq!(log.calls(), vec!["create Hello"]);
        // Duplicate content must not re-arm the silence timer.
        assert_eq!(session.silence_deadline(), deadline);
    }

    #[test]
    fn test_shrink_starts_new_utterance() {
        let (mut session, sink) = session();

        session.on_snapshot(snap_at("Hello there", 0));
        session.on_snapshot(snap_at("Hi", 800));

        assert_eq!(session.store().len(), 1);
        assert_eq!(session.store().all()[0].text, "Hello there");
        assert_eq!(session.open_text(), Some("Hi"));
        assert_eq!(sink.rows().len(), 2);
    }

    #[test]
    fn test_punctuation_starts_new_utterance() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_at("How are you?", 0));
        session.on_snapshot(snap_at("How are you? I am fine", 600));

        assert_eq!(session.store().len(), 1);
        assert_eq!(session.store().all()[0].text, "How are you?");
        assert_eq!(session.open_text(), Some("How are you? I am fine"));
    }

    #[test]
    fn test_divergent_text_starts_new_utterance() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_at("Hello there", 0));
        session.on_snapshot(snap_at("Good morning!", 600));

        assert_eq!(session.store().len(), 1);
        assert_eq!(session.open_text(), Some("Good morning!"));
    }

    #[test]
    fn test_silence_finalizes_open_utterance() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_at("Processing", 0));

        assert!(!session.tick(base() + Duration::milliseconds(1500)));
        assert!(session.is_open());

        assert!(session.tick(base() + Duration::milliseconds(2000)));
        assert!(!session.is_open());
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.store().all()[0].text, "Processing");
    }

    #[test]
    fn test_update_rearms_silence_window() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_at("Hello", 0));
        session.on_snapshot(snap_at("Hello there", 1500));

        // 2500ms after open, but only 1000ms after the last update.
        assert!(!session.tick(base() + Duration::milliseconds(2500)));
        assert!(session.is_open());

        assert!(session.tick(base() + Duration::milliseconds(3500)));
        assert_eq!(session.store().all()[0].text, "Hello there");
    }

    #[test]
    fn test_stale_repeat_after_silence_finalize_is_ignored() {
        let (mut session, sink) = session();

        session.on_snapshot(snap_at("Processing", 0));
        session.tick(base() + Duration::milliseconds(2000));
        assert_eq!(session.store().len(), 1);

        // The region still shows the old text; nothing should reopen.
        session.on_snapshot(snap_at("Processing", 2500));
        assert!(!session.is_open());
        assert_eq!(session.store().len(), 1);
        assert_eq!(sink.rows().len(), 1);

        // New text does reopen.
        session.on_snapshot(snap_at("Next thought", 3000));
        assert!(session.is_open());
    }

    #[test]
    fn test_repeated_message_id_yields_unique_utterance_ids() {
        let (mut session, sink) = session();

        let first = Snapshot {
            message_id: Some("msg-1".to_string()),
            ..snap_at("How are you?", 0)
        };
        let second = Snapshot {
            message_id: Some("msg-1".to_string()),
            ..snap_at("I am fine", 600)
        };
        session.on_snapshot(first);
        session.on_snapshot(second);

        assert_eq!(session.store().len(), 1);
        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].0, rows[1].0);
        assert_eq!(rows[0].0, session.store().all()[0].id);
    }

    #[test]
    fn test_speaker_switch_forces_split() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_from("Alice", "Hello", 0));
        session.on_snapshot(snap_from("Bob", "Hi there", 500));

        assert_eq!(session.store().len(), 1);
        let alice = &session.store().all()[0];
        assert_eq!(alice.speaker, "Alice");
        assert_eq!(alice.text, "Hello");

        assert_eq!(session.open_text(), Some("Hi there"));
    }

    #[test]
    fn test_same_speaker_hint_does_not_split() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_from("Alice", "Hello", 0));
        session.on_snapshot(snap_from("Alice", "Hello there", 500));

        assert!(session.store().is_empty());
        assert_eq!(session.open_text(), Some("Hello there"));
    }

    #[test]
    fn test_empty_snapshot_is_a_noop() {
        let (mut session, sink) = session();

        session.on_snapshot(snap_at("", 0));
        session.on_snapshot(snap_at("   \n\t", 100));
        assert!(!session.is_open());
        assert!(sink.rows().is_empty());

        session.on_snapshot(snap_at("Hello", 200));
        session.on_snapshot(snap_at("", 300));

        // Empty input neither mutates nor finalizes the open utterance.
        assert_eq!(session.open_text(), Some("Hello"));
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_stop_with_flush_finalizes() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_at("Unfinished thought", 0));
        session.stop(true);

        assert_eq!(session.store().len(), 1);
        assert_eq!(session.store().all()[0].text, "Unfinished thought");
        assert!(!session.is_open());
    }

    #[test]
    fn test_stop_without_flush_discards() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_at("Unfinished thought", 0));
        session.stop(false);

        assert!(session.store().is_empty());
        assert!(!session.is_open());
    }

    #[test]
    fn test_snapshots_after_stop_are_dropped() {
        let (mut session, sink) = session();

        session.stop(true);
        session.on_snapshot(snap_at("Hello", 0));

        assert!(!session.is_open());
        assert!(sink.rows().is_empty());
    }

    #[test]
    fn test_at_most_one_open_utterance() {
        let (mut session, _sink) = session();

        let feed = [
            "Hello",
            "Hello there",
            "Hi",
            "How are you?",
            "How are you? I am fine",
            "Short",
        ];
        for (i, text) in feed.iter().enumerate() {
            session.on_snapshot(snap_at(text, i as i64 * 700));
        }

        for utterance in session.store().all() {
            assert_eq!(utterance.state, UtteranceState::Finalized);
        }
        assert!(session.is_open());
    }

    #[test]
    fn test_broken_sink_does_not_corrupt_session() {
        let mut session = CaptionSession::new(SessionConfig::default(), Box::new(BrokenSink));

        session.on_snapshot(snap_at("Hello", 0));
        session.on_snapshot(snap_at("Hello there", 500));
        session.on_snapshot(snap_at("Hi", 1000));
        session.stop(true);

        assert_eq!(session.store().len(), 2);
        assert_eq!(session.store().all()[0].text, "Hello there");
        assert_eq!(session.store().all()[1].text, "Hi");
    }

    #[test]
    fn test_export_through_session() {
        let (mut session, _sink) = session();

        session.on_snapshot(snap_from("Alice", "Hi", 0));
        session.stop(true);

        assert_eq!(session.export(), "[10:00:00] Alice: Hi");
    }
}
