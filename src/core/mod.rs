//! Core pipeline types: configuration, errors, and shared value types.

pub mod config;
pub mod errors;
pub mod segment;

pub use config::{
    BusConfig, FailurePolicy, LlmConfig, OverflowPolicy, PipelineConfig, ShutdownPolicy,
    StorageConfig, SummarizerConfig,
};
pub use errors::{PipelineError, PipelineResult};
pub use segment::{Segment, SummaryRecord};
