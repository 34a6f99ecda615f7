use parking_lot::Mutex;
use std::sync::Arc;

/// Hooks a queue reports into. Called while the queue lock is held, so
/// implementations must not block or call back into the queue.
pub trait QueueMetrics: Send + Sync {
    fn record_depth(&self, size: usize, reserved: usize, capacity: usize);
    fn record_merge(&self);
    fn record_timeout(&self);
    fn record_requeue(&self);
    fn record_flush(&self);
    fn record_rejected(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopQueueMetrics;

impl QueueMetrics for NoopQueueMetrics {
    fn record_depth(&self, _size: usize, _reserved: usize, _capacity: usize) {}
    fn record_merge(&self) {}
    fn record_timeout(&self) {}
    fn record_requeue(&self) {}
    fn record_flush(&self) {}
    fn record_rejected(&self) {}
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryQueueMetrics {
    inner: Arc<Mutex<InMemoryQueueMetricsSnapshot>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InMemoryQueueMetricsSnapshot {
    pub depth: usize,
    pub reserved: usize,
    pub capacity: usize,
    pub high_watermark: usize,
    pub merges: u64,
    pub timeouts: u64,
    pub requeues: u64,
    pub flushes: u64,
    pub rejected: u64,
}

impl InMemoryQueueMetrics {
    pub fn snapshot(&self) -> InMemoryQueueMetricsSnapshot {
        self.inner.lock().clone()
    }
}

impl QueueMetrics for InMemoryQueueMetrics {
    fn record_depth(&self, size: usize, reserved: usize, capacity: usize) {
        let mut guard = self.inner.lock();
        guard.depth = size;
        guard.reserved = reserved;
        guard.capacity = capacity;
        guard.high_watermark = guard.high_watermark.max(size + reserved);
    }

    fn record_merge(&self) {
        self.inner.lock().merges += 1;
    }

    fn record_timeout(&self) {
        self.inner.lock().timeouts += 1;
    }

    fn record_requeue(&self) {
        self.inner.lock().requeues += 1;
    }

    fn record_flush(&self) {
        self.inner.lock().flushes += 1;
    }

    fn record_rejected(&self) {
        self.inner.lock().rejected += 1;
    }
}
