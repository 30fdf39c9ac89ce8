//! Persistent storage for transcript segments and summaries.

pub mod sqlite_store;

pub use sqlite_store::{SqliteTranscriptStore, StoreFuture, TranscriptStore};
