//! Attempt normalization.
//!
//! Spelling attempts are compared after NFKC normalization, trimming,
//! collapsing internal whitespace runs and lowercasing. Only an exact match of
//! the normalized forms counts; there is no partial credit.

use lazy_regex::regex;
use unicode_normalization::UnicodeNormalization;

/// Canonical form of a spelling attempt or target word.
pub fn normalize_attempt(raw: &str) -> String {
    let composed: String = raw.nfkc().collect();
    composed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True when `attempt` spells `word` once both are normalized.
pub fn attempt_matches(word: &str, attempt: &str) -> bool {
    normalize_attempt(word) == normalize_attempt(attempt)
}

/// Clean a transcription result before it is treated as typed text.
///
/// Speech-to-text output tends to carry sentence punctuation ("Testing.");
/// that is stripped here so the transcript can be validated like a typed
/// attempt.
pub fn clean_transcript(raw: &str) -> String {
    let stripped = regex!(r"[.,!?]").replace_all(raw, "");
    normalize_attempt(&stripped)
}
