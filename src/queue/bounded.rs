use super::{Dequeued, QueueStatus};
use crate::config::QueueConfig;
use crate::metrics::{NoopQueueMetrics, QueueMetrics};
use crate::sync::{QueueMonitor, WakePolicy};
use crate::util::{EnqueueError, QueueError};
use log::{info, warn};
use std::collections::VecDeque;

const MONITOR_CONTEXT: &str = "bounded queue state";

#[derive(Debug)]
struct RingState<T> {
    items: VecDeque<T>,
    head: usize,
    flushing: bool,
}

impl<T> RingState<T> {
    fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            head: 0,
            flushing: false,
        }
    }

    fn is_full(&self, capacity: usize) -> bool {
        self.items.len() >= capacity
    }

    fn tail(&self, capacity: usize) -> usize {
        (self.head + self.items.len()) % capacity
    }
}

/// Fixed-capacity FIFO ring of opaque items.
///
/// Producers block while the ring is full and consumers while it is empty.
/// After [`flush`](Self::flush) consumers drain what is left and then get
/// [`Dequeued::Drained`] instead of blocking.
#[derive(Debug)]
pub struct BoundedQueue<T, M: QueueMetrics = NoopQueueMetrics> {
    monitor: QueueMonitor<RingState<T>>,
    capacity: usize,
    metrics: M,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Self::with_config(&QueueConfig::with_capacity(capacity))
    }

    pub fn with_config(config: &QueueConfig) -> Result<Self, QueueError> {
        Self::with_metrics(config, NoopQueueMetrics)
    }
}

impl<T, M: QueueMetrics> BoundedQueue<T, M> {
    pub fn with_metrics(config: &QueueConfig, metrics: M) -> Result<Self, QueueError> {
        if config.capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        Ok(Self {
            monitor: QueueMonitor::new(
                RingState::new(config.capacity),
                config.wake_policy,
                MONITOR_CONTEXT,
            ),
            capacity: config.capacity,
            metrics,
        })
    }

    /// Rebuilds the ring (and its lock) with a new capacity, dropping any
    /// items still stored and clearing the flush flag. Also recovers a queue
    /// whose lock was poisoned.
    pub fn reinit(&mut self, capacity: usize) -> Result<(), QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        let dropped = self
            .monitor
            .get_mut()
            .map(|state| state.items.len())
            .unwrap_or_default();
        let wake = self.monitor.wake_policy();
        self.monitor = QueueMonitor::new(RingState::new(capacity), wake, MONITOR_CONTEXT);
        self.capacity = capacity;
        self.metrics.record_depth(0, 0, capacity);
        info!(
            "event=bounded_queue_reinit capacity={} dropped={}",
            capacity, dropped
        );
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn wake_policy(&self) -> WakePolicy {
        self.monitor.wake_policy()
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Appends `item`, blocking while the ring is full. A full ring that is
    /// flushing rejects the item and hands it back.
    pub fn enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        let capacity = self.capacity;
        let state = self.monitor.lock()?;
        let mut state = self
            .monitor
            .wait_until_space(state, |s| s.flushing || !s.is_full(capacity))?;
        if state.is_full(capacity) {
            self.metrics.record_rejected();
            warn!(
                "event=bounded_enqueue_rejected reason=flushing capacity={}",
                capacity
            );
            return Err(EnqueueError::Flushed(item));
        }
        state.items.push_back(item);
        self.metrics.record_depth(state.items.len(), 0, capacity);
        drop(state);
        self.monitor.signal_data();
        Ok(())
    }

    /// Removes the oldest item, blocking while the ring is empty and not
    /// flushing.
    pub fn dequeue(&self) -> Result<Dequeued<T>, QueueError> {
        let capacity = self.capacity;
        let state = self.monitor.lock()?;
        let (mut state, _) =
            self.monitor
                .wait_until_data(state, |s| s.flushing || !s.items.is_empty(), None)?;
        let Some(item) = state.items.pop_front() else {
            return Ok(Dequeued::Drained);
        };
        state.head = (state.head + 1) % capacity;
        self.metrics.record_depth(state.items.len(), 0, capacity);
        drop(state);
        self.monitor.signal_space();
        Ok(Dequeued::Item(item))
    }

    /// Waits for a free slot and returns the ring index the next enqueue
    /// will occupy, without claiming it.
    pub fn next_slot(&self) -> Result<usize, QueueError> {
        let capacity = self.capacity;
        let state = self.monitor.lock()?;
        let state = self
            .monitor
            .wait_until_space(state, |s| s.flushing || !s.is_full(capacity))?;
        if state.is_full(capacity) {
            return Err(QueueError::Flushed);
        }
        Ok(state.tail(capacity))
    }

    pub fn flush(&self) -> Result<(), QueueError> {
        let mut state = self.monitor.lock()?;
        state.flushing = true;
        self.metrics.record_flush();
        info!(
            "event=bounded_queue_flush size={} capacity={}",
            state.items.len(),
            self.capacity
        );
        drop(state);
        self.monitor.broadcast();
        Ok(())
    }

    pub fn status(&self) -> Result<QueueStatus, QueueError> {
        let state = self.monitor.lock()?;
        Ok(QueueStatus {
            capacity: self.capacity,
            size: state.items.len(),
            reserved: 0,
            flushing: state.flushing,
        })
    }

    pub fn len(&self) -> Result<usize, QueueError> {
        self.status().map(|status| status.size)
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        self.status().map(|status| status.is_empty())
    }

    pub fn is_full(&self) -> Result<bool, QueueError> {
        self.status().map(|status| status.is_full())
    }

    pub fn is_flushing(&self) -> Result<bool, QueueError> {
        self.status().map(|status| status.flushing)
    }

    /// Tears the queue down, handing back whatever was still queued.
    pub fn into_items(self) -> Result<Vec<T>, QueueError> {
        let state = self.monitor.into_inner()?;
        Ok(state.items.into_iter().collect())
    }
}
