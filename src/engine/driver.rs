//! Async driver for a caption session.
//!
//! The session itself is synchronous and single-threaded. The driver
//! owns it on one tokio task and serializes the two event sources
//! through a single `select!` loop: snapshots arriving on a channel,
//! and the silence deadline firing. Snapshot handling and timer expiry
//! are therefore mutually exclusive by construction.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::utterance::Snapshot;

use super::session::CaptionSession;

enum DriverCommand {
    Snapshot(Snapshot),
    Stop { flush: bool },
}

/// Handle for feeding a running session driver.
#[derive(Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<DriverCommand>,
}

impl DriverHandle {
    /// Send one snapshot to the session.
    pub async fn send(&self, snapshot: Snapshot) -> Result<()> {
        self.tx
            .send(DriverCommand::Snapshot(snapshot))
            .await
            .context("caption session driver is gone")
    }

    /// Stop the session, optionally flushing the open utterance.
    pub async fn stop(&self, flush: bool) -> Result<()> {
        self.tx
            .send(DriverCommand::Stop { flush })
            .await
            .context("caption session driver is gone")
    }
}

/// Run a session on its own task. The join handle resolves to the
/// stopped session so the caller can export the transcript.
///
/// Dropping every [`DriverHandle`] stops the session with flush
/// semantics, so an in-progress utterance is never silently lost.
pub fn spawn(session: CaptionSession) -> (DriverHandle, JoinHandle<CaptionSession>) {
    let (tx, rx) = mpsc::channel(64);
    let task = tokio::spawn(run(session, rx));
    (DriverHandle { tx }, task)
}

async fn run(mut session: CaptionSession, mut rx: mpsc::Receiver<DriverCommand>) -> CaptionSession {
    loop {
        let deadline = session.silence_deadline();

        tokio::select! {
            command = rx.recv() => match command {
                Some(DriverCommand::Snapshot(snapshot)) => session.on_snapshot(snapshot),
                Some(DriverCommand::Stop { flush }) => {
                    session.stop(flush);
                    break;
                }
                None => {
                    debug!("All driver handles dropped, flushing session");
                    session.stop(true);
                    break;
                }
            },
            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                if let Some(deadline) = deadline {
                    session.tick(deadline);
                }
            }
        }
    }

    session
}

async fn sleep_until_deadline(deadline: Option<DateTime<Local>>) {
    match deadline {
        Some(deadline) => {
            let remaining = (deadline - Local::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(remaining).await;
        }
        // Guarded out in the select loop; never resolves.
        None => std::future::pending().await,
    }
}
