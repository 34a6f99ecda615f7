use crate::sync::WakePolicy;
use crate::timeouts::{DEFAULT_CAPACITY, DEFAULT_DEQUEUE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Sizing and wake behaviour for a queue instance, usually embedded in a
/// backend's JSON device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub capacity: usize,
    pub wake_policy: WakePolicy,
    pub dequeue_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            wake_policy: WakePolicy::One,
            dequeue_timeout_ms: DEFAULT_DEQUEUE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl QueueConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn with_wake_policy(mut self, wake_policy: WakePolicy) -> Self {
        self.wake_policy = wake_policy;
        self
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), QueueConfigError> {
        if self.capacity == 0 {
            return Err(QueueConfigError::InvalidCapacity);
        }
        if self.dequeue_timeout_ms == 0 {
            return Err(QueueConfigError::InvalidTimeout);
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, QueueConfigError> {
        let config: QueueConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config at `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QueueConfigError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(QueueConfigError::Io(err)),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueConfigError {
    #[error("queue config I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("queue config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("queue capacity must be greater than zero")]
    InvalidCapacity,
    #[error("dequeue timeout must be greater than zero")]
    InvalidTimeout,
}
