//! Connection middleware pipeline.
//!
//! Each stage wraps the handler built so far. Stages are pushed innermost
//! first, so the last stage pushed is the first to see a connection:
//!
//! ```text
//! push(Wamp), push(Session), push(ConnectionTimer), push(WebSocket), push(OriginCheck)
//!
//!   OriginCheck -> WebSocket -> ConnectionTimer -> Session -> Wamp -> application
//! ```

mod connection_timer;
mod origin_check;
mod session_provider;
mod wamp_server;
mod websocket;

use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexSet;
use sockethub_runloop::RunLoop;
use tracing::debug;

use crate::connection::{Connection, Handshake};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::events::EventDispatcher;
use crate::session::SessionHandler;
use crate::wamp::WampMessage;

pub use connection_timer::{ConnectionPeriodicTimer, ConnectionTimerHook};
pub use origin_check::OriginCheck;
pub use session_provider::SessionProvider;
pub use wamp_server::WampServer;
pub use websocket::WebSocketFraming;

/// Payload travelling inward through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Binary(Bytes),
    /// Decoded by the WAMP stage, with CURIEs expanded.
    Wamp(WampMessage),
}

/// A pipeline layer. All methods run on the RunLoop.
pub trait ConnectionHandler: Send + Sync {
    /// Inspect the upgrade request. An error refuses the handshake.
    fn on_handshake(&self, handshake: &Handshake) -> Result<(), PipelineError>;

    fn on_open(&self, conn: &mut Connection) -> Result<(), PipelineError>;

    fn on_message(&self, conn: &mut Connection, message: Message) -> Result<(), PipelineError>;

    fn on_close(&self, conn: &mut Connection);

    fn on_error(&self, conn: &mut Connection, error: &PipelineError);
}

/// Builds a user-supplied stage around an inner handler.
pub trait StageFactory: Send + Sync {
    fn name(&self) -> &str;

    fn wrap(&self, inner: Arc<dyn ConnectionHandler>) -> Arc<dyn ConnectionHandler>;
}

/// Stage descriptor.
pub enum Stage {
    OriginCheck {
        allowed_origins: IndexSet<String>,
        events: Arc<EventDispatcher>,
    },
    WebSocket {
        max_message_size: usize,
    },
    ConnectionTimer {
        run_loop: Arc<RunLoop>,
    },
    Session {
        handler: Arc<dyn SessionHandler>,
        cookie_name: String,
    },
    Wamp {
        server_ident: String,
    },
    Custom(Arc<dyn StageFactory>),
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::OriginCheck { .. } => "origin-check",
            Stage::WebSocket { .. } => "websocket",
            Stage::ConnectionTimer { .. } => "connection-timer",
            Stage::Session { .. } => "session",
            Stage::Wamp { .. } => "wamp",
            Stage::Custom(factory) => factory.name(),
        }
    }

    fn wrap(self, inner: Arc<dyn ConnectionHandler>) -> Arc<dyn ConnectionHandler> {
        match self {
            Stage::OriginCheck {
                allowed_origins,
                events,
            } => Arc::new(OriginCheck::new(inner, allowed_origins, events)),
            Stage::WebSocket { max_message_size } => {
                Arc::new(WebSocketFraming::new(inner, max_message_size))
            }
            Stage::ConnectionTimer { run_loop } => Arc::new(ConnectionTimerHook::new(inner, run_loop)),
            Stage::Session {
                handler,
                cookie_name,
            } => Arc::new(SessionProvider::new(inner, handler, cookie_name)),
            Stage::Wamp { server_ident } => Arc::new(WampServer::new(inner, server_ident)),
            Stage::Custom(factory) => factory.wrap(inner),
        }
    }
}

/// `(outer, inner)` pairs that must keep their relative order when both
/// stages are present.
const ORDER_CONSTRAINTS: [(&str, &str); 2] = [("origin-check", "websocket"), ("session", "wamp")];

/// Ordered list of stages, resolved into a single handler.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage outside every stage pushed so far.
    pub fn push(&mut self, stage: Stage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Stage names from outermost to innermost.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().rev().map(Stage::name).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wrap `innermost` with every stage in push order and return the
    /// outermost handler.
    pub fn resolve(self, innermost: Arc<dyn ConnectionHandler>) -> ServerResult<Arc<dyn ConnectionHandler>> {
        if self.stages.is_empty() {
            return Err(ServerError::EmptyPipeline);
        }
        self.validate_order()?;

        debug!(stages = ?self.stage_names(), "Resolving pipeline");
        Ok(self
            .stages
            .into_iter()
            .fold(innermost, |inner, stage| stage.wrap(inner)))
    }

    fn validate_order(&self) -> ServerResult<()> {
        let position = |name: &str| self.stages.iter().position(|s| s.name() == name);

        for (outer, inner) in ORDER_CONSTRAINTS {
            if let (Some(o), Some(i)) = (position(outer), position(inner)) {
                if o < i {
                    return Err(ServerError::StageOrder {
                        outer: outer.to_string(),
                        inner: inner.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
