//! Bounded FIFO hand-off between segment producers and the summarizer.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Semaphore, TryAcquireError};
use tracing::debug;

use crate::core::config::{BusConfig, OverflowPolicy};
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::segment::Segment;

/// Ordered, capacity-bounded queue with a single logical consumer.
///
/// Free capacity is tracked by a semaphore: `put` takes a slot before pushing,
/// `drain_all` hands every drained slot back. Segments leave the bus in the
/// order their `put` calls completed.
pub struct SegmentBus {
    queue: Mutex<VecDeque<Segment>>,
    slots: Semaphore,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl SegmentBus {
    /// Create a bus from configuration.
    ///
    /// Capacity is clamped to [`Semaphore::MAX_PERMITS`].
    #[must_use]
    pub fn new(config: &BusConfig) -> Self {
        let capacity = config.capacity.min(Semaphore::MAX_PERMITS);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            slots: Semaphore::new(capacity),
            capacity,
            overflow: config.overflow,
        }
    }

    /// Create a blocking bus holding at most `capacity` segments.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(&BusConfig {
            capacity,
            overflow: OverflowPolicy::Block,
        })
    }

    /// Append a segment to the tail.
    ///
    /// With [`OverflowPolicy::Block`] a full bus suspends the caller until the
    /// consumer drains; with [`OverflowPolicy::Reject`] it fails immediately.
    ///
    /// # Errors
    /// Returns [`PipelineError::BusClosed`] once the bus is closed (including
    /// producers already waiting for space), or [`PipelineError::BusFull`] under
    /// the reject policy.
    pub async fn put(&self, segment: Segment) -> PipelineResult<()> {
        let permit = match self.overflow {
            OverflowPolicy::Block => self
                .slots
                .acquire()
                .await
                .map_err(|_| PipelineError::BusClosed)?,
            OverflowPolicy::Reject => self.slots.try_acquire().map_err(|err| match err {
                TryAcquireError::Closed => PipelineError::BusClosed,
                TryAcquireError::NoPermits => PipelineError::BusFull {
                    capacity: self.capacity,
                },
            })?,
        };
        let mut queue = self.queue.lock().await;
        // `close` happens before the final drain takes the lock.
        if self.slots.is_closed() {
            return Err(PipelineError::BusClosed);
        }
        // The slot is returned by `drain_all`, not on drop.
        permit.forget();
        queue.push_back(segment);
        Ok(())
    }

    /// Remove and return every queued segment, oldest first.
    ///
    /// Never waits for segments to arrive; an empty bus yields an empty vector.
    pub async fn drain_all(&self) -> Vec<Segment> {
        let drained: Vec<Segment> = self.queue.lock().await.drain(..).collect();
        if !drained.is_empty() {
            self.slots.add_permits(drained.len());
            debug!(count = drained.len(), "Drained segment bus");
        }
        drained
    }

    /// Stop accepting segments. Queued segments stay drainable.
    pub fn close(&self) {
        self.slots.close();
    }

    /// Whether [`SegmentBus::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Number of queued segments.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Whether no segments are queued.
    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Maximum number of queued segments.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn texts(segments: &[Segment]) -> Vec<String> {
        segments.iter().map(|s| s.text.clone()).collect()
    }

    #[tokio::test]
    async fn test_drain_preserves_put_order() {
        let bus = SegmentBus::with_capacity(16);
        let base = chrono::Utc::now();
        // Timestamps deliberately out of order: delivery follows arrival.
        for (i, offset) in [5_i64, 1, 3, 0].iter().enumerate() {
            let segment =
                Segment::new(format!("s{i}")).at(base + chrono::Duration::seconds(*offset));
            bus.put(segment).await.unwrap();
        }

        let drained = bus.drain_all().await;
        assert_eq!(texts(&drained), vec!["s0", "s1", "s2", "s3"]);
        assert!(bus.is_empty().await);
    }

    #[test]
    fn test_oversized_capacity_is_clamped() {
        let bus = SegmentBus::with_capacity(usize::MAX);
        assert_eq!(bus.capacity(), Semaphore::MAX_PERMITS);
    }

    #[tokio::test]
    async fn test_drain_empty_returns_immediately() {
        let bus = SegmentBus::with_capacity(4);
        assert!(bus.drain_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_full_bus_applies_backpressure() {
        let bus = Arc::new(SegmentBus::with_capacity(2));
        bus.put(Segment::new("a")).await.unwrap();
        bus.put(Segment::new("b")).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), bus.put(Segment::new("x")));
        assert!(blocked.await.is_err(), "put on a full bus must wait");

        let producer = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move { bus.put(Segment::new("c")).await })
        };
        tokio::task::yield_now().await;

        assert_eq!(texts(&bus.drain_all().await), vec!["a", "b"]);
        producer.await.unwrap().unwrap();
        assert_eq!(texts(&bus.drain_all().await), vec!["c"]);
    }

    #[tokio::test]
    async fn test_reject_policy_fails_fast() {
        let bus = SegmentBus::new(&BusConfig {
            capacity: 1,
            overflow: OverflowPolicy::Reject,
        });
        bus.put(Segment::new("a")).await.unwrap();
        let err = bus.put(Segment::new("b")).await.unwrap_err();
        assert!(matches!(err, PipelineError::BusFull { capacity: 1 }));

        bus.drain_all().await;
        bus.put(Segment::new("c")).await.unwrap();
        assert_eq!(bus.len().await, 1);
    }

    #[tokio::test]
    async fn test_close_fails_waiting_and_new_producers() {
        let bus = Arc::new(SegmentBus::with_capacity(1));
        bus.put(Segment::new("kept")).await.unwrap();

        let waiting = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move { bus.put(Segment::new("late")).await })
        };
        tokio::task::yield_now().await;

        bus.close();
        assert!(bus.is_closed());
        assert!(matches!(
            waiting.await.unwrap(),
            Err(PipelineError::BusClosed)
        ));
        assert!(matches!(
            bus.put(Segment::new("after")).await,
            Err(PipelineError::BusClosed)
        ));
        assert_eq!(texts(&bus.drain_all().await), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_put_waiting_on_queue_fails_after_close() {
        let bus = Arc::new(SegmentBus::with_capacity(4));
        let guard = bus.queue.lock().await;

        let producer = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move { bus.put(Segment::new("late")).await })
        };
        // Let the producer take its slot and block on the queue lock.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        bus.close();
        drop(guard);

        assert!(matches!(
            producer.await.unwrap(),
            Err(PipelineError::BusClosed)
        ));
        assert!(bus.drain_all().await.is_empty());
        assert!(bus.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_lose_nothing() {
        let bus = Arc::new(SegmentBus::with_capacity(8));
        let mut producers = Vec::new();
        for p in 0..4 {
            let bus = Arc::clone(&bus);
            producers.push(tokio::spawn(async move {
                for i in 0..50 {
                    bus.put(Segment::spoken(format!("p{p}"), i.to_string()))
                        .await
                        .unwrap();
                }
            }));
        }

        let mut received = Vec::new();
        while received.len() < 200 {
            received.extend(bus.drain_all().await);
            tokio::task::yield_now().await;
        }
        for producer in producers {
            producer.await.unwrap();
        }

        assert_eq!(received.len(), 200);
        for p in 0..4 {
            let speaker = format!("p{p}");
            let own: Vec<usize> = received
                .iter()
                .filter(|s| s.speaker.as_deref() == Some(speaker.as_str()))
                .map(|s| s.text.parse().unwrap())
                .collect();
            assert_eq!(own, (0..50).collect::<Vec<_>>());
        }
    }
}
