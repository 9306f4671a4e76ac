//! Continuation classification.
//!
//! Given the previous and current normalized caption text, decide
//! whether the feed is still growing the same utterance or has moved on
//! to a new one. This is a heuristic approximation of sentence
//! completion, not a grammar: it trades false positives/negatives for
//! cheap evaluation on every sampling tick.

/// Sentence-terminal punctuation, ASCII and CJK full-width forms.
const SENTENCE_TERMINALS: &[char] = &['.', '!', '?', '。', '．', '？', '！'];

/// Classifier verdict for one snapshot against the open utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The current text extends the open utterance.
    Continuation,
    /// The current text starts a new utterance.
    NewSentence,
}

/// Classify `current` against `previous`. Rules are evaluated in order,
/// first match wins:
///
/// 1. nothing to continue (empty previous)
/// 2. the feed shrank, so the region reset or scrolled
/// 3. the previous text already ended a sentence
/// 4. the previous text is not contained in the current text, implying
///    replacement rather than growth
/// 5. otherwise the utterance is still growing
pub fn classify(previous: &str, current: &str) -> Verdict {
    if previous.is_empty() {
        return Verdict::NewSentence;
    }

    if current.chars().count() < previous.chars().count() {
        return Verdict::NewSentence;
    }

    if previous.ends_with(SENTENCE_TERMINALS) {
        return Verdict::NewSentence;
    }

    if !current.contains(previous) {
        return Verdict::NewSentence;
    }

    Verdict::Continuation
}
