//! Prompt assembly for one summarization window.

use std::fmt::Write as _;

use crate::core::segment::Segment;

/// Build the user prompt for a drained window.
///
/// Each segment becomes one line in arrival order. When `previous` holds the
/// running summary it is placed ahead of the new transcript.
#[must_use]
pub fn build_prompt(segments: &[Segment], previous: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(summary) = previous.map(str::trim).filter(|s| !s.is_empty()) {
        let _ = write!(prompt, "Summary so far:\n{summary}\n\nNew transcript:\n");
    }

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            prompt.push('\n');
        }
        let _ = write!(prompt, "{segment}");
    }
    prompt
}
