//! Error types for the RunLoop module.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the RunLoop.
#[derive(Debug, Error)]
pub enum RunLoopError {
    /// RunLoop is already running.
    #[error("RunLoop is already running")]
    AlreadyRunning,

    /// Timer interval is zero.
    #[error("Invalid timer interval {0:?}: interval must be positive")]
    InvalidInterval(Duration),

    /// Source error.
    #[error("Source error: {0}")]
    SourceError(String),

    /// Push transport endpoint could not be bound.
    #[error("Failed to bind push transport on {endpoint}: {source}")]
    PushBind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Push transport send/connect failure.
    #[error("Push transport error: {0}")]
    PushTransport(String),

    /// Channel closed.
    #[error("Channel closed")]
    ChannelClosed,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for RunLoop operations.
pub type RunLoopResult<T> = Result<T, RunLoopError>;
