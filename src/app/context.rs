//! Pipeline context shared by every entry point.

use std::sync::Arc;

use tracing::info;

use crate::broadcast::{BroadcastHub, Broadcaster, PipelineEvent, Subscription};
use crate::bus::SegmentBus;
use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::segment::{Segment, SummaryRecord};
use crate::llm::{LlmClient, OllamaClient};
use crate::storage::{SqliteTranscriptStore, TranscriptStore};
use crate::summarizer::{Summarizer, SummarizerControl};

/// Maximum number of alternatives listed when a model is unknown.
const MAX_LISTED_MODELS: usize = 5;

/// Explicit application context, created once at startup and passed by reference.
pub struct AppContext {
    config: PipelineConfig,
    bus: Arc<SegmentBus>,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn TranscriptStore>,
    hub: Arc<BroadcastHub>,
    control: Arc<SummarizerControl>,
}

impl AppContext {
    /// Assemble a context around existing collaborators.
    #[must_use]
    pub fn from_parts(
        config: PipelineConfig,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn TranscriptStore>,
    ) -> Arc<Self> {
        let bus = Arc::new(SegmentBus::new(&config.bus));
        Arc::new(Self {
            config,
            bus,
            llm,
            store,
            hub: Arc::new(BroadcastHub::new()),
            control: Arc::new(SummarizerControl::new()),
        })
    }

    /// Build the production context: Ollama backend and `SQLite` storage.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or the database cannot be opened.
    pub async fn sqlite(config: PipelineConfig) -> PipelineResult<Arc<Self>> {
        let llm = OllamaClient::new(&config.llm)?;
        let store = SqliteTranscriptStore::new(&config.storage).await?;
        info!(
            base_url = llm.base_url(),
            model = %config.llm.model,
            db = %config.storage.sqlite_path.display(),
            "Pipeline context ready"
        );
        Ok(Self::from_parts(config, Arc::new(llm), Arc::new(store)))
    }

    /// Summarizer wired to this context. Spawn it once.
    #[must_use]
    pub fn summarizer(&self) -> Summarizer {
        Summarizer::new(
            Arc::clone(&self.bus),
            Arc::clone(&self.llm),
            Arc::clone(&self.store),
            Arc::clone(&self.hub) as Arc<dyn Broadcaster>,
            Arc::clone(&self.control),
            self.config.summarizer.clone(),
        )
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Segment bus feeding the summarizer.
    #[must_use]
    pub const fn bus(&self) -> &Arc<SegmentBus> {
        &self.bus
    }

    /// Observer hub.
    #[must_use]
    pub const fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Summarizer control block.
    #[must_use]
    pub const fn control(&self) -> &Arc<SummarizerControl> {
        &self.control
    }

    /// Register an observer for pipeline events.
    #[must_use]
    pub fn subscribe(&self, buffer: usize) -> Subscription {
        self.hub.subscribe(buffer)
    }

    /// Queue `segment` for summarization, then publish it to observers.
    ///
    /// Observers only see segments the bus accepted.
    ///
    /// # Errors
    /// Returns an error if the bus is closed or rejects the segment.
    pub async fn ingest(&self, segment: Segment) -> PipelineResult<()> {
        self.bus.put(segment.clone()).await?;
        self.hub.publish(&PipelineEvent::Segment { segment });
        Ok(())
    }

    /// Pause or resume the summarizer and tell observers.
    pub fn set_running(&self, running: bool) {
        if running {
            self.control.resume();
        } else {
            self.control.pause();
        }
        info!(running, "Summarizer state changed");
        self.hub
            .publish(&PipelineEvent::SummarizerState { running });
    }

    /// Whether the summarizer processes ticks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.control.is_paused()
    }

    /// Model identifiers the backend offers.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be queried.
    pub async fn models(&self) -> PipelineResult<Vec<String>> {
        Ok(self.llm.list_models().await?)
    }

    /// Currently active model.
    #[must_use]
    pub fn active_model(&self) -> String {
        self.llm.model()
    }

    /// Switch to `model` after checking that the backend offers it.
    ///
    /// # Errors
    /// Returns [`PipelineError::UnknownModel`] for an id the backend does not
    /// list, or the backend error if listing fails.
    pub async fn select_model(&self, model: &str) -> PipelineResult<()> {
        let available = self.models().await?;
        if !available.iter().any(|name| name == model) {
            return Err(PipelineError::UnknownModel {
                model: model.to_string(),
                available: available.into_iter().take(MAX_LISTED_MODELS).collect(),
            });
        }

        self.llm.set_model(model);
        info!(model, "Active model changed");
        self.hub.publish(&PipelineEvent::ModelChanged {
            model: model.to_string(),
        });
        Ok(())
    }

    /// Latest summary: the one produced by this process, else the stored one.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn latest_summary(&self) -> PipelineResult<Option<SummaryRecord>> {
        match self.control.latest_summary() {
            Some(record) => Ok(Some(record)),
            None => self.store.latest_summary().await,
        }
    }

    /// Up to `limit` most recent persisted segments, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn recent_segments(&self, limit: usize) -> PipelineResult<Vec<Segment>> {
        self.store.recent_segments(limit, None).await
    }

    /// Up to `limit` most recent persisted summaries, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn summary_history(&self, limit: usize) -> PipelineResult<Vec<SummaryRecord>> {
        self.store.recent_summaries(limit).await
    }
}
