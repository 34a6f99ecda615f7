use super::list::OrderedList;
use super::{Dequeued, Enqueued, ItemOrder, QueueItem, QueueStatus};
use crate::config::QueueConfig;
use crate::metrics::{NoopQueueMetrics, QueueMetrics};
use crate::sync::{QueueMonitor, WaitStatus, WakePolicy};
use crate::util::{EnqueueError, QueueError};
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::time::{Duration, Instant};

const MONITOR_CONTEXT: &str = "ordered queue state";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub use_reserved_slot: bool,
    pub no_signal: bool,
}

impl EnqueueOptions {
    pub fn reserved() -> Self {
        Self {
            use_reserved_slot: true,
            ..Self::default()
        }
    }

    pub fn with_reserved_slot(mut self, use_reserved_slot: bool) -> Self {
        self.use_reserved_slot = use_reserved_slot;
        self
    }

    pub fn with_no_signal(mut self, no_signal: bool) -> Self {
        self.no_signal = no_signal;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DequeueOptions {
    /// Keep the freed slot as a reservation for an imminent re-enqueue.
    pub reserve_slot: bool,
    /// The caller just put an item back; back off once before taking the
    /// head so it does not spin on its own requeued item. The back-off lasts
    /// until the next "not empty" signal, bounded by `timeout` or, without
    /// one, by the queue's configured dequeue timeout.
    pub requeued: bool,
    pub timeout: Option<Duration>,
}

impl DequeueOptions {
    pub fn timed(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn with_reserve_slot(mut self, reserve_slot: bool) -> Self {
        self.reserve_slot = reserve_slot;
        self
    }

    pub fn with_requeued(mut self, requeued: bool) -> Self {
        self.requeued = requeued;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug)]
struct OrderedState<T> {
    list: OrderedList<T>,
    reserved: usize,
    flushing: bool,
}

impl<T> OrderedState<T> {
    fn is_full(&self, capacity: usize) -> bool {
        self.list.len() + self.reserved >= capacity
    }
}

/// Where an incoming payload lands relative to the current list.
struct Placement {
    equal: Option<(usize, usize)>,
    before: Option<usize>,
    position: usize,
}

fn locate<T, O>(list: &OrderedList<T>, incoming: &T, order: &O) -> Placement
where
    O: ItemOrder<T> + ?Sized,
{
    let back = Placement {
        equal: None,
        before: None,
        position: list.len(),
    };
    // Anything ranked after the tail ranks after every queued item.
    match list.back() {
        None => return back,
        Some(tail) if order.compare(incoming, &tail.payload) == Ordering::Greater => return back,
        Some(_) => {}
    }
    let mut equal = None;
    for (position, (index, queued)) in list.iter_indexed().enumerate() {
        match order.compare(incoming, &queued.payload) {
            Ordering::Less => {
                return Placement {
                    equal,
                    before: Some(index),
                    position,
                }
            }
            Ordering::Equal if equal.is_none() => equal = Some((index, position)),
            _ => {}
        }
    }
    Placement { equal, ..back }
}

/// Bounded queue whose dequeue order is decided by a backend-supplied
/// [`ItemOrder`] rather than arrival.
///
/// Capacity is shared between queued items and reservations: a producer that
/// holds a reservation can always enqueue without blocking, and the queue is
/// full once `len + reserved == capacity`, even when nothing is queued yet.
///
/// Share between threads behind an `Arc`; every operation takes `&self`.
#[derive(Debug)]
pub struct OrderedQueue<T, M: QueueMetrics = NoopQueueMetrics> {
    monitor: QueueMonitor<OrderedState<T>>,
    capacity: usize,
    dequeue_timeout: Duration,
    metrics: M,
}

impl<T> OrderedQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Self::with_config(&QueueConfig::with_capacity(capacity))
    }

    pub fn with_config(config: &QueueConfig) -> Result<Self, QueueError> {
        Self::with_metrics(config, NoopQueueMetrics)
    }
}

impl<T, M: QueueMetrics> OrderedQueue<T, M> {
    pub fn with_metrics(config: &QueueConfig, metrics: M) -> Result<Self, QueueError> {
        if config.capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        let state = OrderedState {
            list: OrderedList::with_capacity(config.capacity),
            reserved: 0,
            flushing: false,
        };
        Ok(Self {
            monitor: QueueMonitor::new(state, config.wake_policy, MONITOR_CONTEXT),
            capacity: config.capacity,
            dequeue_timeout: config.dequeue_timeout(),
            metrics,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn wake_policy(&self) -> WakePolicy {
        self.monitor.wake_policy()
    }

    /// Back-off budget for requeued dequeues that carry no timeout of their own.
    pub fn dequeue_timeout(&self) -> Duration {
        self.dequeue_timeout
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Queues `payload`, blocking while the queue is full unless the caller
    /// spends a slot it reserved earlier.
    ///
    /// Once the queue is flushing, an enqueue that would have to wait is
    /// turned away and the payload comes back in [`EnqueueError::Flushed`].
    pub fn enqueue<O>(
        &self,
        payload: T,
        payload_size: usize,
        order: &O,
        options: EnqueueOptions,
    ) -> Result<Enqueued, EnqueueError<T>>
    where
        O: ItemOrder<T> + ?Sized,
    {
        let capacity = self.capacity;
        let mut state = self.monitor.lock()?;
        if options.use_reserved_slot {
            if state.reserved == 0 {
                return Err(QueueError::NoReservation.into());
            }
        } else {
            state = self
                .monitor
                .wait_until_space(state, |s| s.flushing || !s.is_full(capacity))?;
            if state.is_full(capacity) {
                self.metrics.record_rejected();
                warn!(
                    "event=ordered_enqueue_rejected reason=flushing size={} reserved={} \
                     capacity={}",
                    state.list.len(),
                    state.reserved,
                    capacity
                );
                return Err(EnqueueError::Flushed(payload));
            }
        }

        let placement = locate(&state.list, &payload, order);
        let mut incoming = QueueItem::new(payload, payload_size);
        if let Some((index, position)) = placement.equal {
            if let Some(queued) = state.list.get_mut(index) {
                match order.merge(queued, incoming) {
                    Ok(()) => {
                        let released = options.use_reserved_slot;
                        if released {
                            state.reserved -= 1;
                        }
                        self.metrics.record_merge();
                        self.metrics
                            .record_depth(state.list.len(), state.reserved, capacity);
                        debug!(
                            "event=ordered_enqueue_merged position={} size={} reserved={}",
                            position,
                            state.list.len(),
                            state.reserved
                        );
                        drop(state);
                        if released {
                            self.monitor.signal_space();
                        }
                        if !options.no_signal {
                            self.monitor.signal_data();
                        }
                        return Ok(Enqueued::Merged { position });
                    }
                    Err(declined) => incoming = declined,
                }
            }
        }

        match placement.before {
            Some(index) => state.list.insert_before(index, incoming),
            None => state.list.push_back(incoming),
        };
        if options.use_reserved_slot {
            state.reserved -= 1;
        }
        self.metrics
            .record_depth(state.list.len(), state.reserved, capacity);
        drop(state);
        if !options.no_signal {
            self.monitor.signal_data();
        }
        Ok(Enqueued::Inserted {
            position: placement.position,
        })
    }

    /// Removes the head item, blocking while the queue is empty.
    ///
    /// Returns [`Dequeued::Drained`] once the queue is flushing and empty and
    /// [`Dequeued::TimedOut`] when `options.timeout` elapses first; neither
    /// touches the queue.
    pub fn dequeue(&self, options: DequeueOptions) -> Result<Dequeued<QueueItem<T>>, QueueError> {
        let deadline = options
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let mut state = self.monitor.lock()?;
        if options.requeued {
            self.metrics.record_requeue();
            let backoff = deadline.or_else(|| Instant::now().checked_add(self.dequeue_timeout));
            if let Some(backoff) = backoff {
                if !state.flushing {
                    let (next, _) = self.monitor.wait_for_signal(state, backoff)?;
                    state = next;
                }
            }
        }

        let (mut state, status) = self.monitor.wait_until_data(
            state,
            |s| s.flushing || !s.list.is_empty(),
            deadline,
        )?;
        if status == WaitStatus::TimedOut {
            self.metrics.record_timeout();
            debug!(
                "event=ordered_dequeue_timeout timeout_ms={}",
                options.timeout.map(|t| t.as_millis()).unwrap_or_default()
            );
            return Ok(Dequeued::TimedOut);
        }
        let Some(item) = state.list.pop_front() else {
            return Ok(Dequeued::Drained);
        };
        if options.reserve_slot {
            state.reserved += 1;
        }
        self.metrics
            .record_depth(state.list.len(), state.reserved, self.capacity);
        drop(state);
        if !options.reserve_slot {
            self.monitor.signal_space();
        }
        Ok(Dequeued::Item(item))
    }

    /// Claims a slot ahead of the data, blocking while the queue is full.
    pub fn reserve_slot(&self) -> Result<(), QueueError> {
        let capacity = self.capacity;
        let state = self.monitor.lock()?;
        let mut state = self
            .monitor
            .wait_until_space(state, |s| s.flushing || !s.is_full(capacity))?;
        if state.flushing {
            self.metrics.record_rejected();
            return Err(QueueError::Flushed);
        }
        state.reserved += 1;
        self.metrics
            .record_depth(state.list.len(), state.reserved, capacity);
        debug!(
            "event=ordered_slot_reserved reserved={} size={}",
            state.reserved,
            state.list.len()
        );
        Ok(())
    }

    /// Gives back a reservation that will not be filled.
    pub fn unreserve_slot(&self) -> Result<(), QueueError> {
        let mut state = self.monitor.lock()?;
        if state.reserved == 0 {
            return Err(QueueError::NoReservation);
        }
        state.reserved -= 1;
        self.metrics
            .record_depth(state.list.len(), state.reserved, self.capacity);
        debug!(
            "event=ordered_slot_unreserved reserved={} size={}",
            state.reserved,
            state.list.len()
        );
        drop(state);
        self.monitor.signal_space();
        Ok(())
    }

    /// Stops blocking admission and releases every blocked thread. Items
    /// already queued stay available to consumers.
    pub fn flush(&self) -> Result<(), QueueError> {
        let mut state = self.monitor.lock()?;
        state.flushing = true;
        self.metrics.record_flush();
        info!(
            "event=ordered_queue_flush size={} reserved={} capacity={}",
            state.list.len(),
            state.reserved,
            self.capacity
        );
        drop(state);
        self.monitor.broadcast();
        Ok(())
    }

    /// Wakes a consumer after a run of `no_signal` enqueues.
    pub fn notify_consumers(&self) {
        self.monitor.signal_data();
    }

    pub fn peek_first<R>(
        &self,
        inspect: impl FnOnce(&QueueItem<T>) -> R,
    ) -> Result<Option<R>, QueueError> {
        let state = self.monitor.lock()?;
        Ok(state.list.front().map(inspect))
    }

    pub fn peek_last<R>(
        &self,
        inspect: impl FnOnce(&QueueItem<T>) -> R,
    ) -> Result<Option<R>, QueueError> {
        let state = self.monitor.lock()?;
        Ok(state.list.back().map(inspect))
    }

    /// Visits queued items head to tail until `visit` returns true and
    /// reports the position it stopped at.
    pub fn peek_list(
        &self,
        visit: impl FnMut(&QueueItem<T>) -> bool,
    ) -> Result<Option<usize>, QueueError> {
        let state = self.monitor.lock()?;
        Ok(state.list.iter().position(visit))
    }

    /// Copies the queue contents so they can be examined without holding
    /// the lock.
    pub fn peek_clone(&self) -> Result<Vec<QueueItem<T>>, QueueError>
    where
        T: Clone,
    {
        let state = self.monitor.lock()?;
        Ok(state.list.iter().cloned().collect())
    }

    pub fn status(&self) -> Result<QueueStatus, QueueError> {
        let state = self.monitor.lock()?;
        Ok(QueueStatus {
            capacity: self.capacity,
            size: state.list.len(),
            reserved: state.reserved,
            flushing: state.flushing,
        })
    }

    pub fn len(&self) -> Result<usize, QueueError> {
        self.status().map(|status| status.size)
    }

    pub fn reserved(&self) -> Result<usize, QueueError> {
        self.status().map(|status| status.reserved)
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

    /// Tears the queue down, handing any items still queued back in order.
    pub fn into_items(self) -> Result<Vec<QueueItem<T>>, QueueError> {
        let state = self.monitor.into_inner()?;
        Ok(state.list.into_vec())
    }
}
