//! Input and transcript text preparation.
//!
//! Pure functions, no I/O.

use regex::Regex;
use std::sync::LazyLock;

// Non-speech markers emitted by Whisper-style transcribers.
static RE_NON_SPEECH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[(?:BLANK_AUDIO|NO_SPEECH|SILENCE)\]").unwrap());
static RE_MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Trim user input; `None` if nothing is left.
///
/// Empty and whitespace-only input never reaches the reply selector or the
/// transcript.
pub fn normalize_input(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Strip non-speech markers and collapse whitespace in a transcription.
pub fn clean_transcript(text: &str) -> String {
    let c = RE_NON_SPEECH.replace_all(text, " ");
    let c = RE_MULTI_SPACE.replace_all(&c, " ");
    c.trim().to_string()
}

/// Whether `text` is worth sending to a speech synthesizer.
pub fn is_speakable(text: &str) -> bool {
    text.trim().len() >= 2 && text.chars().any(|c| c.is_alphanumeric())
}
