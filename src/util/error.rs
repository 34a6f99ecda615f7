use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue capacity must be greater than zero")]
    InvalidCapacity,
    #[error("queue lock poisoned ({context})")]
    Poisoned { context: &'static str },
    #[error("queue is flushing; no new admissions")]
    Flushed,
    #[error("no reserved slot is outstanding")]
    NoReservation,
}

/// Failure of an enqueue. A payload turned away because the queue is
/// flushing is handed back so the producer keeps ownership of it.
#[derive(Debug, Error)]
pub enum EnqueueError<T> {
    #[error("queue is flushing; item rejected")]
    Flushed(T),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl<T> EnqueueError<T> {
    pub fn into_payload(self) -> Option<T> {
        match self {
            EnqueueError::Flushed(payload) => Some(payload),
            EnqueueError::Queue(_) => None,
        }
    }

    pub fn is_flushed(&self) -> bool {
        matches!(self, EnqueueError::Flushed(_))
    }
}
