//! Transcript and summary persistence.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::core::config::StorageConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::segment::{Segment, SummaryRecord};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistence collaborator for segments and summaries.
pub trait TranscriptStore: Send + Sync {
    /// Append a batch of segments in order.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append_segments(&self, segments: Vec<Segment>) -> StoreFuture<'_, PipelineResult<()>>;

    /// Append one segment.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append_segment(&self, segment: Segment) -> StoreFuture<'_, PipelineResult<()>> {
        self.append_segments(vec![segment])
    }

    /// Append a summary to the history.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append_summary(&self, record: SummaryRecord) -> StoreFuture<'_, PipelineResult<()>>;

    /// Most recently appended summary.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn latest_summary(&self) -> StoreFuture<'_, PipelineResult<Option<SummaryRecord>>>;

    /// Up to `limit` most recent segments at or after `since`, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn recent_segments(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> StoreFuture<'_, PipelineResult<Vec<Segment>>>;

    /// Up to `limit` most recent summaries, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn recent_summaries(&self, limit: usize) -> StoreFuture<'_, PipelineResult<Vec<SummaryRecord>>>;
}

/// `SQLite` implementation of [`TranscriptStore`].
pub struct SqliteTranscriptStore {
    conn: Connection,
}

impl SqliteTranscriptStore {
    /// Open the database at the configured path and create the schema.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> PipelineResult<Self> {
        let parent = config
            .sqlite_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(conn).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> PipelineResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS segments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ts INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    speaker TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_segments_ts ON segments (ts);
                CREATE TABLE IF NOT EXISTS summaries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    summary TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

fn timestamp_from_millis(ms: i64) -> PipelineResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| PipelineError::InvalidRecord(format!("invalid timestamp: {ms}")))
}

fn limit_to_i64(limit: usize) -> PipelineResult<i64> {
    i64::try_from(limit).map_err(|_| PipelineError::InvalidRecord("limit exceeds i64".to_string()))
}

impl TranscriptStore for SqliteTranscriptStore {
    fn append_segments(&self, segments: Vec<Segment>) -> StoreFuture<'_, PipelineResult<()>> {
        Box::pin(async move {
            if segments.is_empty() {
                return Ok(());
            }

            self.conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    {
                        let mut stmt =
                            tx.prepare("INSERT INTO segments (ts, text, speaker) VALUES (?1, ?2, ?3)")?;
                        for segment in segments {
                            stmt.execute(rusqlite::params![
                                segment.timestamp.timestamp_millis(),
                                segment.text,
                                segment.speaker
                            ])?;
                        }
                    }
                    tx.commit()?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn append_summary(&self, record: SummaryRecord) -> StoreFuture<'_, PipelineResult<()>> {
        Box::pin(async move {
            let created_at = record.created_at.timestamp_millis();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO summaries (summary, created_at) VALUES (?1, ?2)",
                        rusqlite::params![record.text, created_at],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn latest_summary(&self) -> StoreFuture<'_, PipelineResult<Option<SummaryRecord>>> {
        Box::pin(async move {
            let row = self
                .conn
                .call(|conn| {
                    let row = conn
                        .query_row(
                            "SELECT summary, created_at FROM summaries ORDER BY id DESC LIMIT 1",
                            [],
                            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;

            match row {
                Some((text, created_at)) => Ok(Some(SummaryRecord {
                    text,
                    created_at: timestamp_from_millis(created_at)?,
                })),
                None => Ok(None),
            }
        })
    }

    fn recent_segments(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> StoreFuture<'_, PipelineResult<Vec<Segment>>> {
        Box::pin(async move {
            let limit = limit_to_i64(limit)?;
            let since_ms = since.map_or(i64::MIN, |ts| ts.timestamp_millis());
            let mut rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT ts, text, speaker FROM segments
                         WHERE ts >= ?1
                         ORDER BY ts DESC, id DESC
                         LIMIT ?2",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![since_ms, limit], |row| {
                            let ts: i64 = row.get(0)?;
                            let text: String = row.get(1)?;
                            let speaker: Option<String> = row.get(2)?;
                            Ok((ts, text, speaker))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.reverse();
            rows.into_iter()
                .map(|(ts, text, speaker)| {
                    Ok(Segment {
                        timestamp: timestamp_from_millis(ts)?,
                        text,
                        speaker,
                    })
                })
                .collect()
        })
    }

    fn recent_summaries(&self, limit: usize) -> StoreFuture<'_, PipelineResult<Vec<SummaryRecord>>> {
        Box::pin(async move {
            let limit = limit_to_i64(limit)?;
            let mut rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT summary, created_at FROM summaries ORDER BY id DESC LIMIT ?1",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![limit], |row| {
                            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.reverse();
            rows.into_iter()
                .map(|(text, created_at)| {
                    Ok(SummaryRecord {
                        text,
                        created_at: timestamp_from_millis(created_at)?,
                    })
                })
                .collect()
        })
    }
}
