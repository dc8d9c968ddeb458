use std::sync::Arc;

use indexmap::IndexSet;
use tracing::warn;

use super::{ConnectionHandler, Message};
use crate::connection::{Connection, Handshake};
use crate::error::PipelineError;
use crate::events::{ClientEvent, EventDispatcher};
use crate::origin::origin_host;

/// Refuses handshakes whose `Origin` host is not allowed.
///
/// A missing `Origin` header is refused as well.
pub struct OriginCheck {
    inner: Arc<dyn ConnectionHandler>,
    allowed_origins: IndexSet<String>,
    events: Arc<EventDispatcher>,
}

impl OriginCheck {
    pub fn new(
        inner: Arc<dyn ConnectionHandler>,
        allowed_origins: IndexSet<String>,
        events: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            inner,
            allowed_origins,
            events,
        }
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        origin.is_some_and(|o| self.allowed_origins.contains(&origin_host(o)))
    }
}

impl ConnectionHandler for OriginCheck {
    fn on_handshake(&self, handshake: &Handshake) -> Result<(), PipelineError> {
        let origin = handshake.origin();
        if !self.is_allowed(origin) {
            warn!(remote_addr = %handshake.remote_addr(), "Rejected connection from origin {:?}", origin);
            self.events.dispatch_client(&ClientEvent::Rejected {
                remote_addr: handshake.remote_addr(),
                origin: origin.map(str::to_string),
            });
            return Err(PipelineError::OriginRejected {
                origin: origin.map(str::to_string),
            });
        }
        self.inner.on_handshake(handshake)
    }

    fn on_open(&self, conn: &mut Connection) -> Result<(), PipelineError> {
        self.inner.on_open(conn)
    }

    fn on_message(&self, conn: &mut Connection, message: Message) -> Result<(), PipelineError> {
        self.inner.on_message(conn, message)
    }

    fn on_close(&self, conn: &mut Connection) {
        self.inner.on_close(conn)
    }

    fn on_error(&self, conn: &mut Connection, error: &PipelineError) {
        self.inner.on_error(conn, error)
    }
}
