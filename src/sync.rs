//! Mutex plus the two condition variables every queue waits on.
//!
//! All blocking in the crate goes through [`QueueMonitor`]: callers name the
//! predicate they are waiting for and the monitor owns the recheck loop, so a
//! spurious or stolen wakeup can never be mistaken for the condition holding.

use crate::util::{lock_or_poison, QueueError};
use serde::{Deserialize, Serialize};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Instant;

/// How many waiters a single enqueue or dequeue wakes. Flush always wakes
/// every waiter regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakePolicy {
    #[default]
    One,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Ready,
    TimedOut,
}

#[derive(Debug)]
pub struct QueueMonitor<S> {
    state: Mutex<S>,
    not_full: Condvar,
    not_empty: Condvar,
    wake: WakePolicy,
    context: &'static str,
}

impl<S> QueueMonitor<S> {
    pub fn new(state: S, wake: WakePolicy, context: &'static str) -> Self {
        Self {
            state: Mutex::new(state),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            wake,
            context,
        }
    }

    pub fn wake_policy(&self) -> WakePolicy {
        self.wake
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, S>, QueueError> {
        lock_or_poison(&self.state, self.context)
    }

    /// Blocks on "not full" until `ready` holds for the protected state.
    pub fn wait_until_space<'a, F>(
        &'a self,
        guard: MutexGuard<'a, S>,
        ready: F,
    ) -> Result<MutexGuard<'a, S>, QueueError>
    where
        F: Fn(&S) -> bool,
    {
        self.not_full
            .wait_while(guard, |state| !ready(state))
            .map_err(|_| self.poisoned())
    }

    /// Blocks on "not empty" until `ready` holds or `deadline` passes.
    /// On timeout the guard is handed back with the predicate still false.
    pub fn wait_until_data<'a, F>(
        &'a self,
        mut guard: MutexGuard<'a, S>,
        ready: F,
        deadline: Option<Instant>,
    ) -> Result<(MutexGuard<'a, S>, WaitStatus), QueueError>
    where
        F: Fn(&S) -> bool,
    {
        let Some(deadline) = deadline else {
            let guard = self
                .not_empty
                .wait_while(guard, |state| !ready(state))
                .map_err(|_| self.poisoned())?;
            return Ok((guard, WaitStatus::Ready));
        };
        loop {
            if ready(&guard) {
                return Ok((guard, WaitStatus::Ready));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok((guard, WaitStatus::TimedOut));
            }
            let (next, _) = self
                .not_empty
                .wait_timeout(guard, deadline - now)
                .map_err(|_| self.poisoned())?;
            guard = next;
        }
    }

    /// Waits for a single "not empty" notification (or the deadline) without
    /// a predicate. Used by consumers backing off after requeueing an item.
    pub fn wait_for_signal<'a>(
        &'a self,
        guard: MutexGuard<'a, S>,
        deadline: Instant,
    ) -> Result<(MutexGuard<'a, S>, WaitStatus), QueueError> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        if timeout.is_zero() {
            return Ok((guard, WaitStatus::TimedOut));
        }
        let (guard, result) = self
            .not_empty
            .wait_timeout(guard, timeout)
            .map_err(|_| self.poisoned())?;
        let status = if result.timed_out() {
            WaitStatus::TimedOut
        } else {
            WaitStatus::Ready
        };
        Ok((guard, status))
    }

    pub fn signal_space(&self) {
        match self.wake {
            WakePolicy::One => self.not_full.notify_one(),
            WakePolicy::All => self.not_full.notify_all(),
        }
    }

    pub fn signal_data(&self) {
        match self.wake {
            WakePolicy::One => self.not_empty.notify_one(),
            WakePolicy::All => self.not_empty.notify_all(),
        }
    }

    /// Wakes every waiter on both conditions.
    pub fn broadcast(&self) {
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn get_mut(&mut self) -> Result<&mut S, QueueError> {
        let context = self.context;
        self.state
            .get_mut()
            .map_err(|_| QueueError::Poisoned { context })
    }

    pub fn into_inner(self) -> Result<S, QueueError> {
        let context = self.context;
        self.state
            .into_inner()
            .map_err(|_| QueueError::Poisoned { context })
    }

    fn poisoned(&self) -> QueueError {
        QueueError::Poisoned {
            context: self.context,
        }
    }
}
