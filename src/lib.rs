//! Live transcript digest: buffers transcript segments and keeps a running summary
//! of them with a local language model.

// Forbid unsafe and non-idiomatic practices
#![deny(warnings)] // Every warning is an error
#![deny(unsafe_code)] // No unsafe code
#![deny(missing_docs)] // Every public function, struct, enum and module is documented
#![deny(dead_code)] // No unused code
#![deny(non_camel_case_types)] // Types use CamelCase

// Nothing slips through
#![deny(unused_imports)] // No unused imports
#![deny(unused_variables)] // No unused variables
#![deny(unused_must_use)] // Results and Options are handled explicitly
#![deny(non_snake_case)] // Variables and functions use snake_case
#![deny(non_upper_case_globals)] // Constants and globals use UPPER_CASE
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)] // No unwrap()
#![deny(clippy::expect_used)] // No expect()
#![deny(clippy::panic)] // No panic!()
#![deny(clippy::print_stdout)] // No println!() in production
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::missing_const_for_fn)] // const wherever possible
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::module_inception)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::shadow_unrelated)]
#![deny(clippy::too_many_arguments)]
#![deny(clippy::cognitive_complexity)]
#![deny(overflowing_literals)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

/// Application context replacing process-wide state.
pub mod app;
/// Observer fan-out of pipeline events.
pub mod broadcast;
/// Bounded segment hand-off queue.
pub mod bus;
/// Configuration, errors and shared value types.
pub mod core;
/// Scripted demo meeting.
pub mod demo;
/// Language model client, Ollama adapter and response parsing.
pub mod llm;
/// Process entry used by the `live-digest` binary.
pub mod start_live_digest;
/// Transcript and summary persistence.
pub mod storage;
/// Timer-driven summarization worker.
pub mod summarizer;

#[cfg(test)]
mod testing;
