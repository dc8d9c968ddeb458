//! Connection model.
//!
//! A [`Connection`] is owned by its socket task and only mutated on the
//! RunLoop. Outbound frames go through a [`ConnectionSender`] to the socket's
//! writer task.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use indexmap::IndexSet;
use tokio::sync::mpsc;
use tracing::debug;

use crate::pipeline::ConnectionPeriodicTimer;
use crate::session::Session;
use crate::wamp::{PrefixMap, WampMessage};

pub type ConnectionId = String;

/// HTTP upgrade request seen by the pipeline.
#[derive(Debug, Clone)]
pub struct Handshake {
    remote_addr: SocketAddr,
    path: String,
    headers: HeaderMap,
}

impl Handshake {
    pub fn new(remote_addr: SocketAddr, path: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            remote_addr,
            path: path.into(),
            headers,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn origin(&self) -> Option<&str> {
        self.header("origin")
    }

    /// Value of a cookie from the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all("cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim_matches('"').to_string())
    }
}

/// Frame queued for a socket writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// Cloneable handle for writing to one connection.
#[derive(Debug, Clone)]
pub struct ConnectionSender {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionSender {
    pub fn new(id: impl Into<ConnectionId>, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id: id.into(), tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a text frame. Returns false once the socket is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.tx.send(Outbound::Text(text.into())).is_ok()
    }

    pub fn send_wamp(&self, message: &WampMessage) -> bool {
        self.send_text(message.encode())
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        self.tx
            .send(Outbound::Close {
                code,
                reason: reason.into(),
            })
            .is_ok()
    }
}

/// Protocol state kept per connection by the WAMP stage and application.
#[derive(Debug, Default)]
pub struct WampState {
    pub session_id: String,
    pub prefixes: PrefixMap,
    pub subscriptions: IndexSet<String>,
}

/// One accepted WebSocket connection.
pub struct Connection {
    id: ConnectionId,
    handshake: Handshake,
    sender: ConnectionSender,
    closed: bool,
    opened: bool,
    pub session: Option<Session>,
    pub wamp: WampState,
    pub periodic_timers: Option<ConnectionPeriodicTimer>,
}

impl Connection {
    pub fn new(handshake: Handshake, sender: ConnectionSender) -> Self {
        Self {
            id: sender.id().to_string(),
            handshake,
            sender,
            closed: false,
            opened: false,
            session: None,
            wamp: WampState::default(),
            periodic_timers: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.handshake.remote_addr()
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn sender(&self) -> &ConnectionSender {
        &self.sender
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.sender.send_text(text)
    }

    pub fn send_wamp(&self, message: &WampMessage) -> bool {
        self.sender.send_wamp(message)
    }

    /// Send a close frame. Later messages from the client are ignored.
    pub fn close(&mut self, code: u16, reason: impl Into<String>) {
        if self.closed {
            return;
        }
        self.closed = true;
        let reason = reason.into();
        debug!(conn_id = %self.id, code, "Closing connection: {}", reason);
        self.sender.close(code, reason);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Set once the application has seen the open.
    pub(crate) fn mark_opened(&mut self) {
        self.opened = true;
    }

    /// Whether every stage completed `on_open` and the application accepted it.
    pub fn is_opened(&self) -> bool {
        self.opened
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr())
            .field("opened", &self.opened)
            .field("closed", &self.closed)
            .field("subscriptions", &self.wamp.subscriptions)
            .finish()
    }
}
