//! Timer-driven summarization worker.
//!
//! Drains the segment bus on every tick, asks the language model for a summary
//! of the drained window, then persists and publishes the result. Cycles run
//! strictly one after another.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::broadcast::{Broadcaster, PipelineEvent};
use crate::bus::SegmentBus;
use crate::core::config::{FailurePolicy, ShutdownPolicy, SummarizerConfig};
use crate::core::segment::{Segment, SummaryRecord};
use crate::llm::{LlmClient, Reply};
use crate::storage::TranscriptStore;
use crate::summarizer::prompt::build_prompt;

/// Lifecycle state of a summarizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SummarizerState {
    /// Created, loop not started.
    Idle = 0,
    /// Waiting for the next tick.
    Collecting = 1,
    /// A cycle is in progress.
    Summarizing = 2,
    /// Loop exited.
    Stopped = 3,
}

impl SummarizerState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Collecting,
            2 => Self::Summarizing,
            _ => Self::Stopped,
        }
    }
}

/// Result of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Paused; the bus was left untouched.
    Paused,
    /// Nothing was buffered.
    Empty,
    /// A window was sent to the model.
    Summarized {
        /// Segments in the window.
        segments: usize,
        /// Whether the model call failed.
        failed: bool,
    },
}

/// Handles shared between a running summarizer and its owner.
pub struct SummarizerControl {
    paused: AtomicBool,
    state: AtomicU8,
    stop_requested: AtomicBool,
    shutdown: Notify,
    latest: RwLock<Option<SummaryRecord>>,
}

impl Default for SummarizerControl {
    fn default() -> Self {
        Self {
            paused: AtomicBool::new(false),
            state: AtomicU8::new(SummarizerState::Idle as u8),
            stop_requested: AtomicBool::new(false),
            shutdown: Notify::new(),
            latest: RwLock::new(None),
        }
    }
}

impl SummarizerControl {
    /// Create a running (not paused) control block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip ticks until resumed. Segments keep accumulating on the bus.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Process the next tick again. Does not trigger a cycle by itself.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Whether ticks are currently skipped.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SummarizerState {
        SummarizerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Ask the loop to stop. A cycle in progress finishes first.
    pub fn request_shutdown(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        // Stores a permit if the loop is not currently waiting.
        self.shutdown.notify_one();
    }

    /// Last published summary.
    #[must_use]
    pub fn latest_summary(&self) -> Option<SummaryRecord> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: SummarizerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn replace_latest(&self, record: SummaryRecord) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(record);
    }
}

/// Bus consumer that turns drained windows into summaries.
pub struct Summarizer {
    bus: Arc<SegmentBus>,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn TranscriptStore>,
    broadcaster: Arc<dyn Broadcaster>,
    control: Arc<SummarizerControl>,
    config: SummarizerConfig,
    running_summary: Option<String>,
}

impl Summarizer {
    /// Create a summarizer over its collaborators.
    #[must_use]
    pub fn new(
        bus: Arc<SegmentBus>,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn TranscriptStore>,
        broadcaster: Arc<dyn Broadcaster>,
        control: Arc<SummarizerControl>,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            bus,
            llm,
            store,
            broadcaster,
            control,
            config,
            running_summary: None,
        }
    }

    /// Shared control block.
    #[must_use]
    pub fn control(&self) -> Arc<SummarizerControl> {
        Arc::clone(&self.control)
    }

    /// Run one tick now.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.control.is_paused() {
            debug!("Summarizer paused, skipping tick");
            return TickOutcome::Paused;
        }

        let window = self.bus.drain_all().await;
        if window.is_empty() {
            return TickOutcome::Empty;
        }
        self.summarize(window).await
    }

    async fn summarize(&mut self, window: Vec<Segment>) -> TickOutcome {
        let count = window.len();
        self.control.set_state(SummarizerState::Summarizing);

        if let Err(err) = self.store.append_segments(window.clone()).await {
            error!(count, error = %err, "Failed to persist drained segments");
        }

        let previous = if self.config.carry_previous_summary {
            self.running_summary.as_deref()
        } else {
            None
        };
        let prompt = build_prompt(&window, previous);
        debug!(count, prompt_chars = prompt.len(), "Summarizing window");

        let outcome = match self.llm.try_complete(&prompt).await {
            Ok(reply) => {
                self.running_summary = Some(reply.content.clone());
                self.publish(reply.content).await;
                TickOutcome::Summarized {
                    segments: count,
                    failed: false,
                }
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, count, "Summarization call failed");
                match self.config.on_failure {
                    FailurePolicy::PublishMessage => {
                        self.publish(Reply::from_error(&err).content).await;
                    }
                    FailurePolicy::KeepPrevious => {
                        info!(count, "Keeping previous summary after failed call");
                    }
                }
                TickOutcome::Summarized {
                    segments: count,
                    failed: true,
                }
            }
        };

        self.control.set_state(SummarizerState::Collecting);
        outcome
    }

    async fn publish(&self, text: String) {
        let record = SummaryRecord::new(text);
        if let Err(err) = self.store.append_summary(record.clone()).await {
            error!(error = %err, "Failed to persist summary");
        }
        self.control.replace_latest(record.clone());
        self.broadcaster.publish(&PipelineEvent::Summary {
            summary: record.text,
        });
    }

    /// Spawn the tick loop as a tokio task.
    #[must_use]
    pub fn spawn(self) -> SummarizerHandle {
        let control = self.control();
        let join = tokio::spawn(self.run());
        SummarizerHandle { control, join }
    }

    /// Run the tick loop until shutdown is requested.
    ///
    /// The first tick fires one interval after start. Late ticks are delayed,
    /// never bunched.
    pub async fn run(mut self) {
        let period = self.config.interval();
        info!(?period, "Starting summarizer");
        self.control.set_state(SummarizerState::Collecting);

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.control.stop_requested() {
            let stop = tokio::select! {
                biased;
                () = self.control.shutdown.notified() => true,
                _ = ticker.tick() => false,
            };
            if stop {
                break;
            }

            match self.tick().await {
                TickOutcome::Summarized { segments, failed } => {
                    info!(segments, failed, "Summary cycle completed");
                }
                TickOutcome::Paused | TickOutcome::Empty => {}
            }
        }

        self.finish().await;
        self.control.set_state(SummarizerState::Stopped);
        info!("Summarizer stopped");
    }

    async fn finish(&mut self) {
        self.bus.close();
        let remaining = self.bus.drain_all().await;
        if remaining.is_empty() {
            return;
        }

        let count = remaining.len();
        let paused = self.control.is_paused();
        if paused || self.config.on_shutdown == ShutdownPolicy::Discard {
            warn!(count, paused, "Discarding buffered segments at shutdown");
            return;
        }

        info!(count, "Flushing buffered segments before shutdown");
        self.summarize(remaining).await;
    }
}

/// Owner side of a spawned summarizer.
pub struct SummarizerHandle {
    control: Arc<SummarizerControl>,
    join: JoinHandle<()>,
}

impl SummarizerHandle {
    /// Shared control block.
    #[must_use]
    pub const fn control(&self) -> &Arc<SummarizerControl> {
        &self.control
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// # Errors
    /// Returns an error if the task panicked.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.control.request_shutdown();
        self.join.await
    }
}
