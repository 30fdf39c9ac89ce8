//! Fan-out of pipeline events to live observers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error};

use crate::core::segment::Segment;

/// Event delivered to observers, serialized as tagged JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A segment entered the pipeline.
    Segment {
        /// The ingested segment.
        segment: Segment,
    },
    /// A new summary was produced.
    Summary {
        /// Summary text.
        summary: String,
    },
    /// The summarizer was paused or resumed.
    SummarizerState {
        /// Whether ticks are processed.
        running: bool,
    },
    /// The active model changed.
    ModelChanged {
        /// New model identifier.
        model: String,
    },
}

/// Sink for pipeline events. Publishing never fails.
pub trait Broadcaster: Send + Sync {
    /// Deliver `event` to every current observer.
    fn publish(&self, event: &PipelineEvent);
}

/// Receiving end of a hub subscription.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Arc<str>>,
}

impl Subscription {
    /// Identifier assigned by the hub.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Next serialized event, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Next event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.rx.try_recv().ok()
    }
}

/// Broadcaster with a bounded queue per subscriber.
///
/// A subscriber whose queue is full misses that event; other subscribers are
/// unaffected. Subscribers that dropped their receiver are pruned on the next
/// publish.
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: DashMap<u64, mpsc::Sender<Arc<str>>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer with room for `buffer` pending events.
    #[must_use]
    pub fn subscribe(&self, buffer: usize) -> Subscription {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, tx);
        debug!(subscriber = id, "Observer subscribed");
        Subscription { id, rx }
    }

    /// Remove an observer.
    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.remove(&id);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Broadcaster for BroadcastHub {
    fn publish(&self, event: &PipelineEvent) {
        let payload: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => Arc::from(json),
            Err(err) => {
                error!(error = %err, "Failed to serialize pipeline event");
                return;
            }
        };

        self.subscribers
            .retain(|id, tx| match tx.try_send(Arc::clone(&payload)) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = *id, "Observer queue full, event dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = *id, "Observer gone, removing");
                    false
                }
            });
    }
}
