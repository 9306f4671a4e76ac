//! Caption text normalization.
//!
//! The caption region's `textContent` leaks UI chrome into the feed:
//! icon ligature names and navigation affordances render as plain text
//! alongside the speech. Normalization strips the known artifacts and
//! collapses whitespace so the classifier only ever sees content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Known non-content artifacts that appear in caption region text.
/// Matched as literal substrings, not patterns.
const UI_ARTIFACTS: &[&str] = &[
    "arrow_downward",
    "keyboard_arrow_down",
    "keyboard_arrow_up",
    "expand_more",
    "expand_less",
    "more_vert",
    "Jump to bottom",
];

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strip known UI artifacts and collapse whitespace.
///
/// Total and idempotent: never fails, empty input yields empty output,
/// and `normalize(normalize(x)) == normalize(x)`.
///
/// Collapsing can canonicalize an artifact's interior whitespace, and
/// stripping one artifact can uncover another, so one pass in either
/// order is not enough: strip and collapse repeat until the text stops
/// changing. Each pass only ever shortens the text, so this terminates.
pub fn normalize(raw: &str) -> String {
    let mut text = collapse_whitespace(raw);
    loop {
        let pass = collapse_whitespace(&strip_artifacts(&text));
        if pass == text {
            return pass;
        }
        text = pass;
    }
}

fn strip_artifacts(text: &str) -> String {
    let mut out = text.to_string();
    for artifact in UI_ARTIFACTS {
        if out.contains(artifact) {
            out = out.replace(artifact, " ");
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}
