use super::QueueItem;
use std::cmp::Ordering;
use std::fmt;

/// Ordering and coalescing strategy a backend supplies with each enqueue.
///
/// `compare` ranks the incoming payload against one already queued: `Less`
/// places it in front of that item. When it reports `Equal` the queue offers
/// the incoming item to `merge`; returning it back (`Err`) declines, and the
/// item is linked after the equivalent ones instead.
pub trait ItemOrder<T> {
    fn compare(&self, incoming: &T, queued: &T) -> Ordering;

    fn merge(
        &self,
        _queued: &mut QueueItem<T>,
        incoming: QueueItem<T>,
    ) -> Result<(), QueueItem<T>> {
        Err(incoming)
    }
}

/// Arrival order: every payload ranks after everything already queued.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoOrder;

impl<T> ItemOrder<T> for FifoOrder {
    fn compare(&self, _incoming: &T, _queued: &T) -> Ordering {
        Ordering::Greater
    }
}

/// Ascending order of a key extracted from each payload; equal keys keep
/// arrival order and are never merged.
#[derive(Clone, Copy)]
pub struct KeyOrder<F> {
    key: F,
}

impl<F> KeyOrder<F> {
    pub fn new(key: F) -> Self {
        Self { key }
    }
}

impl<F> fmt::Debug for KeyOrder<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyOrder").finish_non_exhaustive()
    }
}

impl<T, K, F> ItemOrder<T> for KeyOrder<F>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    fn compare(&self, incoming: &T, queued: &T) -> Ordering {
        (self.key)(incoming).cmp(&(self.key)(queued))
    }
}

/// Closure pair standing in for a backend's compare/update callbacks.
#[derive(Clone, Copy)]
pub struct FnOrder<C, M> {
    compare: C,
    merge: M,
}

impl<C, M> FnOrder<C, M> {
    pub fn new(compare: C, merge: M) -> Self {
        Self { compare, merge }
    }
}

impl<C, M> fmt::Debug for FnOrder<C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOrder").finish_non_exhaustive()
    }
}

impl<T, C, M> ItemOrder<T> for FnOrder<C, M>
where
    C: Fn(&T, &T) -> Ordering,
    M: Fn(&mut QueueItem<T>, QueueItem<T>) -> Result<(), QueueItem<T>>,
{
    fn compare(&self, incoming: &T, queued: &T) -> Ordering {
        (self.compare)(incoming, queued)
    }

    fn merge(&self, queued: &mut QueueItem<T>, incoming: QueueItem<T>) -> Result<(), QueueItem<T>> {
        (self.merge)(queued, incoming)
    }
}
