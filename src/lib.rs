//! capscribe: live-caption stream stabilization.
//!
//! Converts a noisy, rapidly rewritten live-caption text feed into a
//! clean, ordered sequence of finalized utterances, each attributed to
//! a timestamp and (when available) a speaker, ready for display and
//! transcript export.
//!
//! The snapshot source (whatever observes the caption region), the
//! render surface, and transcript persistence all live outside this
//! crate; the engine only consumes [`Snapshot`]s and talks outward
//! through the [`RenderSink`] trait.

pub mod classifier;
pub mod engine;
pub mod normalizer;
pub mod render;
pub mod settings;
pub mod store;
pub mod utterance;

pub use classifier::{classify, Verdict};
pub use engine::{CaptionSession, DriverHandle, SessionConfig, SilenceTimer};
pub use normalizer::normalize;
pub use render::{CaptionEvent, CollectingSink, RenderAdapter, RenderError, RenderSink};
pub use settings::CaptionSettings;
pub use store::UtteranceStore;
pub use utterance::{Snapshot, Utterance, UtteranceState};
