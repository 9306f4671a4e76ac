//! Caption stream stabilization engine.
//!
//! Turns the noisy, repeatedly rewritten live-caption feed into
//! discrete finalized utterances.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        CaptionSession                            │
//! │                                                                  │
//! │  snapshot ──▶ Normalizer ──▶ Classifier ──▶ slot (one open       │
//! │                                   │         utterance)           │
//! │                                   │              │               │
//! │                            SilenceTimer ─────────┤               │
//! │                            (quiet window)        ▼               │
//! │                                     ┌────────────┴───────────┐   │
//! │                                     ▼                        ▼   │
//! │                              UtteranceStore           RenderAdapter
//! │                              (finalized, ordered)     (create/update)
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is synchronous; [`driver`] wraps it in a tokio task for
//! callers that feed it from live sources.

pub mod driver;
pub mod session;
pub mod silence;

pub use driver::{spawn, DriverHandle};
pub use session::{CaptionSession, SessionConfig};
pub use silence::SilenceTimer;
