//! Server and pipeline errors.

use axum::http::StatusCode;
use sockethub_config::ConfigError;
use sockethub_runloop::RunLoopError;
use thiserror::Error;

use crate::wamp::WampError;

/// Fatal startup and bootstrap errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot resolve an empty pipeline")]
    EmptyPipeline,

    #[error("Pipeline stage '{outer}' must wrap stage '{inner}'")]
    StageOrder { outer: String, inner: String },

    #[error(transparent)]
    RunLoop(#[from] RunLoopError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while a connection travels through the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Origin rejected: {}", origin.as_deref().unwrap_or("<none>"))]
    OriginRejected { origin: Option<String> },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(&'static str),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Application error: {0}")]
    Application(String),

    #[error("Connection closed")]
    Closed,
}

impl PipelineError {
    /// WebSocket close code sent when the error ends the connection.
    pub fn close_code(&self) -> u16 {
        match self {
            PipelineError::OriginRejected { .. } => 1008,
            PipelineError::Protocol(_) => 1007,
            PipelineError::MessageTooLarge { .. } => 1009,
            PipelineError::UnsupportedFrame(_) => 1003,
            PipelineError::Session(_) | PipelineError::Application(_) => 1011,
            PipelineError::Closed => 1000,
        }
    }

    /// Whether the connection is closed after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Application(_))
    }

    /// HTTP status used when the error refuses a handshake.
    pub fn http_status(&self) -> StatusCode {
        match self {
            PipelineError::OriginRejected { .. } => StatusCode::FORBIDDEN,
            PipelineError::Protocol(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WampError> for PipelineError {
    fn from(e: WampError) -> Self {
        PipelineError::Protocol(e.to_string())
    }
}
