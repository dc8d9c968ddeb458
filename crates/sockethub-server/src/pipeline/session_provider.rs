use std::sync::Arc;

use tracing::debug;

use super::{ConnectionHandler, Message};
use crate::connection::{Connection, Handshake};
use crate::error::PipelineError;
use crate::session::{Session, SessionHandler};

/// Binds the HTTP session named by the session cookie to the connection.
pub struct SessionProvider {
    inner: Arc<dyn ConnectionHandler>,
    handler: Arc<dyn SessionHandler>,
    cookie_name: String,
}

impl SessionProvider {
    pub fn new(
        inner: Arc<dyn ConnectionHandler>,
        handler: Arc<dyn SessionHandler>,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            handler,
            cookie_name: cookie_name.into(),
        }
    }

    fn load(&self, conn: &Connection) -> Result<Session, PipelineError> {
        let Some(session_id) = conn.handshake().cookie(&self.cookie_name) else {
            return Ok(Session::anonymous());
        };

        let data = self
            .handler
            .read(&session_id)
            .map_err(|e| PipelineError::Session(e.to_string()))?
            .unwrap_or_default();
        debug!(conn_id = conn.id(), handler = self.handler.name(), "Session {} bound", session_id);
        Ok(Session::new(session_id, data))
    }
}

impl ConnectionHandler for SessionProvider {
    fn on_handshake(&self, handshake: &Handshake) -> Result<(), PipelineError> {
        self.inner.on_handshake(handshake)
    }

    fn on_open(&self, conn: &mut Connection) -> Result<(), PipelineError> {
        conn.session = Some(self.load(conn)?);
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
