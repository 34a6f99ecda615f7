//! Sizing and wait defaults shared by both queue kinds and [`QueueConfig`].
//!
//! [`QueueConfig`]: crate::config::QueueConfig

use std::time::Duration;

/// Capacity used when a backend does not size its queue explicitly.
pub const DEFAULT_CAPACITY: usize = 10;
/// Budget granted to a timed dequeue when the caller asks for the default.
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(300);
