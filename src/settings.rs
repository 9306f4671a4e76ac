use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Persisted caption preferences.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CaptionSettings {
    /// Quiet window in milliseconds before an unchanged open utterance
    /// is forcibly finalized.
    #[serde(default = "default_silence_window_ms")]
    pub silence_window_ms: u64,

    /// Whether the caption panel is shown. Read at startup, written on
    /// toggle.
    #[serde(default = "default_caption_visible")]
    pub caption_visible: bool,

    /// Where exported transcripts are written, when configured.
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            silence_window_ms: default_silence_window_ms(),
            caption_visible: default_caption_visible(),
            transcript_path: None,
        }
    }
}

fn default_silence_window_ms() -> u64 {
    2000
}

fn default_caption_visible() -> bool {
    true
}

/// Load settings from `path`, creating the file with defaults when it
/// does not exist. A file that fails to parse falls back to defaults
/// and is rewritten.
pub fn load_or_create(path: &Path) -> Result<CaptionSettings> {
    if !path.exists() {
        let settings = CaptionSettings::default();
        write(path, &settings)?;
        return Ok(settings);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;

    match serde_json::from_str::<CaptionSettings>(&raw) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            warn!("Failed to parse settings, falling back to defaults: {}", e);
            let settings = CaptionSettings::default();
            write(path, &settings)?;
            Ok(settings)
        }
    }
}

/// Write settings to `path` as pretty-printed JSON.
pub fn write(path: &Path, settings: &CaptionSettings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write settings to {}", path.display()))
}
