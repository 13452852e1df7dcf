use thiserror::Error;

/// Errors raised by queue operations and the stress harness
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Relocation out of a shared queue that still holds items
    #[error("cannot relocate from a non-empty queue ({len} items pending)")]
    NonEmptySource { len: usize },
    #[error("invalid stress configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while writing run reports
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}
