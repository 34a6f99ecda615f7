//! Bounded and ordered blocking queues for storage spooling backends.
//!
//! [`BoundedQueue`] is a fixed-capacity FIFO ring; [`OrderedQueue`] adds
//! slot reservation, comparator-driven insertion with in-place coalescing,
//! non-destructive peeking and timed dequeue. Both shut down through
//! `flush`, after which consumers drain what is left and then receive
//! [`Dequeued::Drained`] instead of blocking.

pub mod config;
pub mod metrics;
pub mod queue;
pub mod spool;
pub mod sync;
pub mod timeouts;
pub mod util;

pub use config::{QueueConfig, QueueConfigError};
pub use metrics::{
    InMemoryQueueMetrics, InMemoryQueueMetricsSnapshot, NoopQueueMetrics, QueueMetrics,
};
pub use queue::{
    BoundedQueue, DequeueOptions, Dequeued, EnqueueOptions, Enqueued, FifoOrder, FnOrder,
    ItemOrder, KeyOrder, OrderedQueue, QueueItem, QueueState, QueueStatus,
};
pub use spool::{SpoolBlock, SpoolOrder};
pub use sync::{QueueMonitor, WaitStatus, WakePolicy};
pub use timeouts::{DEFAULT_CAPACITY, DEFAULT_DEQUEUE_TIMEOUT};
pub use util::{EnqueueError, QueueError};
