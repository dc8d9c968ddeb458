use std::sync::Arc;

use super::{ConnectionHandler, Message};
use crate::connection::{Connection, Handshake};
use crate::error::PipelineError;

/// WebSocket message policy: text only, bounded size.
pub struct WebSocketFraming {
    inner: Arc<dyn ConnectionHandler>,
    max_message_size: usize,
}

impl WebSocketFraming {
    pub fn new(inner: Arc<dyn ConnectionHandler>, max_message_size: usize) -> Self {
        Self {
            inner,
            max_message_size,
        }
    }
}

impl ConnectionHandler for WebSocketFraming {
    fn on_handshake(&self, handshake: &Handshake) -> Result<(), PipelineError> {
        self.inner.on_handshake(handshake)
    }

    fn on_open(&self, conn: &mut Connection) -> Result<(), PipelineError> {
        self.inner.on_open(conn)
    }

    fn on_message(&self, conn: &mut Connection, message: Message) -> Result<(), PipelineError> {
        match &message {
            Message::Text(text) if text.len() > self.max_message_size => {
                Err(PipelineError::MessageTooLarge {
                    size: text.len(),
                    max: self.max_message_size,
                })
            }
            Message::Binary(_) => Err(PipelineError::UnsupportedFrame("binary")),
            _ => self.inner.on_message(conn, message),
        }
    }

    fn on_close(&self, conn: &mut Connection) {
        self.inner.on_close(conn)
    }

    fn on_error(&self, conn: &mut Connection, error: &PipelineError) {
        self.inner.on_error(conn, error)
    }
}
