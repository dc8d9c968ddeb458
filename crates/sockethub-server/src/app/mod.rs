//! Application layer behind the pipeline.

mod rpc;
mod topic;
mod topic_application;
mod topic_handler;

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use sockethub_runloop::PushHandler;

use crate::connection::{Connection, Handshake};
use crate::error::PipelineError;
use crate::pipeline::{ConnectionHandler, Message};
use crate::wamp::{PublishExclude, WampMessage};

pub use rpc::{RpcError, RpcHandler, RpcRegistry};
pub use topic::Topic;
pub use topic_application::{PushMessage, TopicApplication};
pub use topic_handler::{TopicHandler, TopicHandlerRegistry};

/// WAMP application. Every callback runs on the RunLoop.
pub trait WampApplication: Send + Sync {
    fn on_open(&self, conn: &mut Connection);

    fn on_close(&self, conn: &mut Connection);

    fn on_call(&self, conn: &mut Connection, call_id: &str, procedure: &str, args: Vec<Value>);

    fn on_subscribe(&self, conn: &mut Connection, topic: &str);

    fn on_unsubscribe(&self, conn: &mut Connection, topic: &str);

    fn on_publish(
        &self,
        conn: &mut Connection,
        topic: &str,
        event: Value,
        exclude: PublishExclude,
        eligible: Vec<String>,
    );

    fn on_error(&self, conn: &mut Connection, error: &PipelineError);

    /// Payload received from the push transport.
    fn on_push(&self, payload: Bytes);
}

/// Innermost pipeline handler: routes decoded WAMP messages to the
/// application.
pub struct ApplicationHandler {
    app: Arc<dyn WampApplication>,
}

impl ApplicationHandler {
    pub fn new(app: Arc<dyn WampApplication>) -> Self {
        Self { app }
    }
}

impl ConnectionHandler for ApplicationHandler {
    fn on_handshake(&self, _handshake: &Handshake) -> Result<(), PipelineError> {
        Ok(())
    }

    fn on_open(&self, conn: &mut Connection) -> Result<(), PipelineError> {
        conn.mark_opened();
        self.app.on_open(conn);
        Ok(())
    }

    fn on_message(&self, conn: &mut Connection, message: Message) -> Result<(), PipelineError> {
        let Message::Wamp(message) = message else {
            return Err(PipelineError::Protocol(
                "application expects decoded WAMP messages".to_string(),
            ));
        };

        match message {
            WampMessage::Call {
                call_id,
                proc_uri,
                args,
            } => self.app.on_call(conn, &call_id, &proc_uri, args),
            WampMessage::Subscribe { topic_uri } => self.app.on_subscribe(conn, &topic_uri),
            WampMessage::Unsubscribe { topic_uri } => self.app.on_unsubscribe(conn, &topic_uri),
            WampMessage::Publish {
                topic_uri,
                event,
                exclude,
                eligible,
            } => self.app.on_publish(conn, &topic_uri, event, exclude, eligible),
            other => {
                return Err(PipelineError::Protocol(format!(
                    "unexpected message type {}",
                    other.type_id()
                )));
            }
        }
        Ok(())
    }

    /// Skipped when an outer stage failed `on_open`.
    fn on_close(&self, conn: &mut Connection) {
        if conn.is_opened() {
            self.app.on_close(conn)
        }
    }

    fn on_error(&self, conn: &mut Connection, error: &PipelineError) {
        self.app.on_error(conn, error)
    }
}

/// Forwards push transport payloads to the application.
pub struct ApplicationPushHandler {
    app: Arc<dyn WampApplication>,
}

impl ApplicationPushHandler {
    pub fn new(app: Arc<dyn WampApplication>) -> Self {
        Self { app }
    }
}

impl PushHandler for ApplicationPushHandler {
    fn on_push(&self, payload: Bytes) {
        self.app.on_push(payload)
    }
}
