//! Periodic summarization of buffered transcript windows.

pub mod prompt;
pub mod worker;

pub use prompt::build_prompt;
pub use worker::{Summarizer, SummarizerControl, SummarizerHandle, SummarizerState, TickOutcome};
