//! Shared helpers (errors, lock handling).

pub mod error;

pub use error::{EnqueueError, QueueError};

use log::warn;
use std::sync::{Mutex, MutexGuard};

pub(crate) fn lock_or_poison<'a, T>(
    mutex: &'a Mutex<T>,
    context: &'static str,
) -> Result<MutexGuard<'a, T>, QueueError> {
    mutex.lock().map_err(|_| {
        warn!("event=queue_lock_poisoned context={}", context);
        QueueError::Poisoned { context }
    })
}
