use thiserror::Error;

/// Errors that can occur within the scheduling subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Delay must be at least {min} seconds")]
    DelayTooShort { min: i64 },

    #[error("Maximum of {cap} scheduled items reached")]
    CapacityExceeded { cap: usize },

    /// The job table could not be persisted.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The coordinator loop is gone; no requests can be served.
    #[error("Scheduler is not running")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
