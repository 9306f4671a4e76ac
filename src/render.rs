//! Render adapter: lifecycle events out, sink calls in.
//!
//! The session never touches a UI surface directly. It emits
//! [`CaptionEvent`]s into a [`RenderAdapter`], which translates them
//! into create/update calls on whatever [`RenderSink`] the embedder
//! provides. Sink failures are logged and swallowed here; the session's
//! own state stays authoritative regardless of what the sink does.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

/// Errors a render sink may report.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no caption row exists for id '{0}'")]
    MissingRow(String),
    #[error("render sink is closed")]
    Closed,
}

/// Outward-facing display surface for caption rows.
///
/// `Send` so a session owning a boxed sink can move onto the driver
/// task.
pub trait RenderSink: Send {
    /// Create a new row for an utterance.
    fn create(
        &mut self,
        id: &str,
        speaker: &str,
        timestamp: DateTime<Local>,
        text: &str,
    ) -> Result<(), RenderError>;

    /// Replace the text of an existing row.
    fn update(&mut self, id: &str, text: &str) -> Result<(), RenderError>;
}

/// Lifecycle events emitted by the caption session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CaptionEvent {
    /// A new utterance opened.
    Created {
        id: String,
        speaker: String,
        timestamp: DateTime<Local>,
        text: String,
    },
    /// The open utterance's text grew.
    Updated { id: String, text: String },
    /// The utterance froze and moved into the store.
    Finalized { id: String, text: String },
}

/// Translates lifecycle events into sink calls.
///
/// Guarantees that an update is only forwarded for an id that was
/// previously created, and makes no sink call on finalize (the row
/// already shows the final text).
pub struct RenderAdapter {
    sink: Box<dyn RenderSink>,
    created: HashSet<String>,
}

impl RenderAdapter {
    pub fn new(sink: Box<dyn RenderSink>) -> Self {
        Self {
            sink,
            created: HashSet::new(),
        }
    }

    pub fn handle(&mut self, event: &CaptionEvent) {
        match event {
            CaptionEvent::Created {
                id,
                speaker,
                timestamp,
                text,
            } => {
                self.created.insert(id.clone());
                if let Err(e) = self.sink.create(id, speaker, *timestamp, text) {
                    warn!("Render sink failed to create row '{}': {}", id, e);
                }
            }
            CaptionEvent::Updated { id, text } => {
                if !self.created.contains(id) {
                    warn!("Dropping update for never-created row '{}'", id);
                    return;
                }
                if let Err(e) = self.sink.update(id, text) {
                    warn!("Render sink failed to update row '{}': {}", id, e);
                }
            }
            CaptionEvent::Finalized { id, .. } => {
                debug!("Row '{}' finalized, no sink call needed", id);
            }
        }
    }
}

/// Sink that records rows in memory. Used by the replay CLI and tests.
///
/// Clones share the same row storage, so a handle kept by the caller
/// still sees rows after the sink itself moves into an adapter.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    rows: Arc<Mutex<Vec<(String, String)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in creation order as `(id, current text)` pairs.
    pub fn rows(&self) -> Vec<(String, String)> {
        self.rows.lock().unwrap().clone()
    }
}

impl RenderSink for CollectingSink {
    fn create(
        &mut self,
        id: &str,
        _speaker: &str,
        _timestamp: DateTime<Local>,
        text: &str,
    ) -> Result<(), RenderError> {
        self.rows
            .lock()
            .unwrap()
            .push((id.to_string(), text.to_string()));
        Ok(())
    }

    fn update(&mut self, id: &str, text: &str) -> Result<(), RenderError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|(row_id, _)| row_id == id) {
            Some((_, row_text)) => {
                *row_text = text.to_string();
                Ok(())
            }
            None => Err(RenderError::MissingRow(id.to_string())),
        }
    }
}
