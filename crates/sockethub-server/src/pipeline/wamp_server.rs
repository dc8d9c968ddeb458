use std::sync::Arc;

use tracing::{debug, trace};

use super::{ConnectionHandler, Message};
use crate::connection::{Connection, Handshake};
use crate::error::PipelineError;
use crate::wamp::{WampMessage, PROTOCOL_VERSION};

/// WAMP v1 server protocol.
///
/// Sends WELCOME on open, keeps the client's CURIE prefixes and hands
/// decoded client messages inward with their URIs expanded.
pub struct WampServer {
    inner: Arc<dyn ConnectionHandler>,
    server_ident: String,
}

impl WampServer {
    pub fn new(inner: Arc<dyn ConnectionHandler>, server_ident: impl Into<String>) -> Self {
        Self {
            inner,
            server_ident: server_ident.into(),
        }
    }

    fn expand(conn: &Connection, message: WampMessage) -> WampMessage {
        let prefixes = &conn.wamp.prefixes;
        match message {
            WampMessage::Call {
                call_id,
                proc_uri,
                args,
            } => WampMessage::Call {
                call_id,
                proc_uri: prefixes.resolve(&proc_uri),
                args,
            },
            WampMessage::Subscribe { topic_uri } => WampMessage::Subscribe {
                topic_uri: prefixes.resolve(&topic_uri),
            },
            WampMessage::Unsubscribe { topic_uri } => WampMessage::Unsubscribe {
                topic_uri: prefixes.resolve(&topic_uri),
            },
            WampMessage::Publish {
                topic_uri,
                event,
                exclude,
                eligible,
            } => WampMessage::Publish {
                topic_uri: prefixes.resolve(&topic_uri),
                event,
                exclude,
                eligible,
            },
            other => other,
        }
    }

    fn dispatch(&self, conn: &mut Connection, message: WampMessage) -> Result<(), PipelineError> {
        if message.is_server_message() {
            return Err(PipelineError::Protocol(format!(
                "message type {} cannot be sent by a client",
                message.type_id()
            )));
        }

        if let WampMessage::Prefix { prefix, uri } = message {
            debug!(conn_id = conn.id(), "Prefix {} registered for {}", prefix, uri);
            conn.wamp.prefixes.insert(prefix, uri);
            return Ok(());
        }

        let message = Self::expand(conn, message);
        self.inner.on_message(conn, Message::Wamp(message))
    }
}

impl ConnectionHandler for WampServer {
    fn on_handshake(&self, handshake: &Handshake) -> Result<(), PipelineError> {
        self.inner.on_handshake(handshake)
    }

    fn on_open(&self, conn: &mut Connection) -> Result<(), PipelineError> {
        conn.wamp.session_id = conn.id().to_string();
        let welcome = WampMessage::Welcome {
            session_id: conn.wamp.session_id.clone(),
            protocol_version: PROTOCOL_VERSION,
            server_ident: self.server_ident.clone(),
        };
        if !conn.send_wamp(&welcome) {
            return Err(PipelineError::Closed);
        }
        self.inner.on_open(conn)
    }

    fn on_message(&self, conn: &mut Connection, message: Message) -> Result<(), PipelineError> {
        match message {
            Message::Text(text) => {
                trace!(conn_id = conn.id(), "WAMP frame: {}", text);
                let decoded = WampMessage::decode(&text)?;
                self.dispatch(conn, decoded)
            }
            Message::Wamp(decoded) => self.dispatch(conn, decoded),
            Message::Binary(_) => Err(PipelineError::UnsupportedFrame("binary")),
        }
    }

    fn on_close(&self, conn: &mut Connection) {
        self.inner.on_close(conn)
    }

    fn on_error(&self, conn: &mut Connection, error: &PipelineError) {
        self.inner.on_error(conn, error)
    }
}
