//! Bounded FIFO and comparator-ordered queues shared by spooling backends.

mod bounded;
pub(crate) mod list;
mod order;
mod ordered;

pub use bounded::BoundedQueue;
pub use order::{FifoOrder, FnOrder, ItemOrder, KeyOrder};
pub use ordered::{DequeueOptions, EnqueueOptions, OrderedQueue};

/// One unit of work in transit: the producer's payload plus the byte count
/// the backend accounts it as. The queue never looks inside either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem<T> {
    pub payload: T,
    pub payload_size: usize,
}

impl<T> QueueItem<T> {
    pub fn new(payload: T, payload_size: usize) -> Self {
        Self {
            payload,
            payload_size,
        }
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Result of a blocking dequeue that did not fail.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<I> {
    Item(I),
    /// The queue is flushing and has nothing left to hand out.
    Drained,
    /// The caller's deadline passed before data arrived.
    TimedOut,
}

impl<I> Dequeued<I> {
    pub fn into_item(self) -> Option<I> {
        match self {
            Dequeued::Item(item) => Some(item),
            Dequeued::Drained | Dequeued::TimedOut => None,
        }
    }

    pub fn is_drained(&self) -> bool {
        matches!(self, Dequeued::Drained)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Dequeued::TimedOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// A new node was linked at `position` (0 is the head).
    Inserted { position: usize },
    /// The payload was folded into the equivalent node at `position`.
    Merged { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Empty,
    Partial,
    Full,
    Draining,
}

/// Point-in-time view of a queue's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    pub capacity: usize,
    pub size: usize,
    pub reserved: usize,
    pub flushing: bool,
}

impl QueueStatus {
    pub fn is_full(&self) -> bool {
        self.size + self.reserved >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.size + self.reserved)
    }

    pub fn state(&self) -> QueueState {
        if self.flushing {
            QueueState::Draining
        } else if self.is_full() {
            QueueState::Full
        } else if self.is_empty() {
            QueueState::Empty
        } else {
            QueueState::Partial
        }
    }
}
