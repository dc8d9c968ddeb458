//! Port-triggered sources for the RunLoop.
//!
//! A Source1 (like CFRunLoopSourceContext version 1) is fed through a
//! channel. Producers push [`PortMessage`]s from any task; the RunLoop wakes
//! up and calls [`Source1::handle`] on its own execution context.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};

use crate::error::RunLoopResult;

/// Source1 - Port-triggered source.
///
/// Automatically triggered via channel, no manual signal needed.
pub trait Source1: Send + Sync {
    /// Get the source ID.
    fn id(&self) -> &str;

    /// Handle a port message on the RunLoop.
    fn handle(&self, msg: PortMessage) -> RunLoopResult<()>;

    /// Check if the source is valid.
    fn is_valid(&self) -> bool {
        true
    }

    /// Cancel the source.
    fn cancel(&self);
}

/// Port message for Source1.
///
/// Similar to Mach Message in iOS.
#[derive(Debug, Clone)]
pub struct PortMessage {
    /// Source ID that sent this message.
    pub source_id: String,

    /// Raw message payload.
    pub payload: Bytes,

    /// Timestamp when the message was received.
    pub timestamp: DateTime<Utc>,
}

impl PortMessage {
    /// Create a new port message.
    pub fn new(source_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            source_id: source_id.into(),
            payload: payload.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Source1 receiver wrapper.
///
/// The receiver is wrapped in `Arc<Mutex<...>>` so the RunLoop can wait on
/// several receivers at once without holding the source list lock.
pub struct Source1Receiver {
    /// The source implementation.
    pub source: Arc<dyn Source1>,

    /// Message receiver.
    pub receiver: Arc<Mutex<mpsc::Receiver<PortMessage>>>,
}

impl Source1Receiver {
    /// Create a new Source1Receiver.
    pub fn new(source: Arc<dyn Source1>, receiver: mpsc::Receiver<PortMessage>) -> Self {
        Self {
            source,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Option<PortMessage> {
        if let Ok(mut guard) = self.receiver.try_lock() {
            guard.try_recv().ok()
        } else {
            None
        }
    }

    /// Receiver handle for concurrent waiting.
    pub fn receiver_arc(&self) -> Arc<Mutex<mpsc::Receiver<PortMessage>>> {
        self.receiver.clone()
    }
}
