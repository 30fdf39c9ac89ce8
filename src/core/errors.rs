//! Error types for the ingestion and summarization pipeline.

use thiserror::Error;

use crate::llm::errors::LlmError;

/// Pipeline error type.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The segment bus no longer accepts data.
    #[error("segment bus is closed; the pipeline is no longer accepting segments")]
    BusClosed,
    /// The segment bus is at capacity and the overflow policy rejects new segments.
    #[error("segment bus is full (capacity {capacity})")]
    BusFull {
        /// Configured bus capacity.
        capacity: usize,
    },
    /// A stored row could not be turned back into a record.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
    /// Requested model is not offered by the backend.
    #[error("model '{model}' not found. Available models: {}", available.join(", "))]
    UnknownModel {
        /// Requested model identifier.
        model: String,
        /// A few of the identifiers the backend does offer.
        available: Vec<String>,
    },
    /// Language model backend error.
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
