//! Bounded, lock-free ingestion queues with backpressure.
//!
//! The controller thread is the sole consumer; probes, watch callbacks,
//! and RPC handlers are producers running on other threads. A full queue
//! signals backpressure to its producer rather than growing without
//! bound or blocking the controller thread.

use crossbeam_queue::ArrayQueue;

/// Result of attempting to push to a full queue.
#[derive(Debug)]
pub enum PushResult<T> {
    Ok,
    Backpressure(T),
}

/// A bounded, multi-producer single-consumer queue with backpressure
/// signaling.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> BoundedQueue<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    pub fn try_push(&self, item: T) -> PushResult<T> {
        match self.inner.push(item) {
            Ok(()) => PushResult::Ok,
            Err(item) => PushResult::Backpressure(item),
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Pops up to `max` items into a `Vec`, for one tick's worth of
    /// ingestion.
    pub fn pop_batch(&self, max: usize) -> Vec<T> {
        let mut batch = Vec::with_capacity(max.min(self.inner.len()));
        for _ in 0..max {
            match self.inner.pop() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

/// The four queues the controller drains once per tick.
#[derive(Debug)]
pub struct IngestionQueues {
    pub probes: BoundedQueue<ridgeline_agent_protocol::ProbeReport>,
    pub wanted_state_edits: BoundedQueue<ridgeline_agent_protocol::WantedStateEdit>,
    pub resource_blocks: BoundedQueue<ridgeline_agent_protocol::ResourceBlockSignal>,
    pub activation_acks: BoundedQueue<ridgeline_agent_protocol::ActivationAck>,
}

impl IngestionQueues {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            probes: BoundedQueue::new(capacity),
            wanted_state_edits: BoundedQueue::new(capacity),
            resource_blocks: BoundedQueue::new(capacity),
            activation_acks: BoundedQueue::new(capacity),
        }
    }
}
