//! Silence-based finalization timing.
//!
//! One timer guards the currently open utterance. Every snapshot that
//! changes the utterance's text re-arms it, so the deadline only fires
//! after a full quiet window with no text change. The timer holds a
//! plain deadline and is driven by whatever "now" the caller supplies,
//! which keeps tests deterministic; the async driver maps the deadline
//! onto the tokio clock.

use chrono::{DateTime, Duration, Local};
use log::debug;

/// Debounce deadline for the open utterance.
#[derive(Debug, Default)]
pub struct SilenceTimer {
    deadline: Option<DateTime<Local>>,
}

impl SilenceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the countdown: the deadline becomes `now + window_ms`.
    pub fn arm(&mut self, now: DateTime<Local>, window_ms: u64) {
        let deadline = now + Duration::milliseconds(window_ms as i64);
        debug!("SilenceTimer armed, deadline {}", deadline.format("%H:%M:%S%.3f"));
        self.deadline = Some(deadline);
    }

    /// Stop the countdown without firing.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            debug!("SilenceTimer cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if armed.
    pub fn deadline(&self) -> Option<DateTime<Local>> {
        self.deadline
    }

    /// Consume an expired deadline. Returns true at most once per arm:
    /// the timer disarms itself when it fires.
    pub fn take_expired(&mut self, now: DateTime<Local>) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                debug!("SilenceTimer expired at {}", now.format("%H:%M:%S%.3f"));
                true
            }
            _ => false,
        }
    }
}
