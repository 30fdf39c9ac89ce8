//! Process entry for the `live-digest` binary.
//!
//! Loads configuration, opens storage and the model backend, runs the
//! summarizer against the scripted demo meeting, and shuts down on Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;

use crate::app::AppContext;
use crate::core::config::PipelineConfig;
use crate::demo;

/// Delay between scripted demo lines.
const DEMO_PACING: Duration = Duration::from_millis(500);

/// Pending events kept for the log observer.
const LOG_OBSERVER_BUFFER: usize = 64;

/// Run the pipeline until interrupted.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting live-digest v{}", env!("CARGO_PKG_VERSION"));

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Pipeline error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn serve(config: PipelineConfig) -> anyhow::Result<()> {
    tracing::info!(
        ollama = %config.llm.base_url,
        model = %config.llm.model,
        interval_secs = config.summarizer.interval_secs,
        "Pipeline configuration loaded"
    );

    let ctx = AppContext::sqlite(config)
        .await
        .context("failed to initialise pipeline")?;

    let summarizer = ctx.summarizer().spawn();
    let observer = tokio::spawn(log_summaries(Arc::clone(&ctx)));
    let feeder = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            match demo::feed(&ctx, usize::MAX, DEMO_PACING).await {
                Ok(lines) => tracing::info!(lines, "Demo meeting fed"),
                Err(e) => tracing::error!("Demo feed stopped: {e}"),
            }
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    feeder.abort();
    summarizer
        .shutdown()
        .await
        .context("summarizer task failed")?;
    observer.abort();

    if let Some(latest) = ctx.latest_summary().await? {
        tracing::info!(created_at = %latest.created_at, "Final summary:\n{}", latest.text);
    }
    Ok(())
}

async fn log_summaries(ctx: Arc<AppContext>) {
    let mut events = ctx.subscribe(LOG_OBSERVER_BUFFER);
    while let Some(payload) = events.recv().await {
        let Ok(event) = serde_json::from_str::<Value>(&payload) else {
            continue;
        };
        if event["type"] == "summary" {
            let text = event["summary"].as_str().unwrap_or_default();
            tracing::info!("Summary updated:\n{text}");
        }
    }
}
