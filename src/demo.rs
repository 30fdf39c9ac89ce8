//! Scripted meeting used to exercise the pipeline without a live transcriber.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::app::AppContext;
use crate::core::errors::PipelineResult;
use crate::core::segment::Segment;

const SCRIPT: &[(&str, &str)] = &[
    ("Alice", "Let's start by reviewing the Q4 results."),
    ("Bob", "I've prepared the financial overview."),
    ("Alice", "Great, can you walk us through the key metrics?"),
    ("Bob", "Revenue is up 15% compared to last quarter."),
    ("Charlie", "That's excellent news. What about expenses?"),
    ("Bob", "Expenses are well controlled, only up 3%."),
    ("Alice", "So we're looking at a strong profit margin."),
    ("Charlie", "Yes, this positions us well for next year."),
    ("Alice", "Let's discuss the roadmap for Q1."),
    ("Bob", "I think we should focus on the new product launch."),
    ("Charlie", "Agreed, but we also need to address technical debt."),
    ("Alice", "Let's prioritize both. Bob, can you draft a plan?"),
    ("Bob", "I'll have something ready by Friday."),
    ("Alice", "Perfect. Any other items to discuss?"),
    ("Charlie", "I think we're good. Let's wrap up."),
    ("Alice", "Sounds good. Meeting adjourned."),
];

/// Spoken-time gap between consecutive scripted lines.
const LINE_GAP_SECS: i64 = 3;

/// The scripted quarterly review, stamped from `base` at three second steps.
#[must_use]
pub fn demo_segments(base: DateTime<Utc>) -> Vec<Segment> {
    (0_i64..)
        .zip(SCRIPT)
        .map(|(i, (speaker, text))| {
            Segment::spoken(*speaker, *text).at(base + chrono::Duration::seconds(i * LINE_GAP_SECS))
        })
        .collect()
}

/// Ingest up to `count` scripted lines, waiting `pacing` after each.
///
/// Returns how many lines were ingested.
///
/// # Errors
/// Returns an error if the pipeline stops accepting segments.
pub async fn feed(ctx: &AppContext, count: usize, pacing: Duration) -> PipelineResult<usize> {
    let segments = demo_segments(Utc::now());
    let total = count.min(segments.len());
    info!(lines = total, "Feeding demo meeting");

    for segment in segments.into_iter().take(total) {
        debug!(line = %segment, "Demo segment");
        ctx.ingest(segment).await?;
        tokio::time::sleep(pacing).await;
    }
    Ok(total)
}
