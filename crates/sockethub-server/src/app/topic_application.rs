use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sockethub_runloop::TopicPeriodicTimer;
use tracing::{debug, info, warn};

use super::rpc::{RpcHandler, RpcRegistry};
use super::topic::Topic;
use super::topic_handler::{TopicHandler, TopicHandlerRegistry};
use super::WampApplication;
use crate::connection::Connection;
use crate::error::PipelineError;
use crate::events::{ClientEvent, EventDispatcher};
use crate::wamp::{PublishExclude, WampMessage};

/// JSON body of a push transport frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub topic: String,
    #[serde(default)]
    pub data: Value,
}

/// Pub/sub and RPC application.
///
/// Topics exist while they have subscribers. A topic handler's periodic
/// timers are registered when the topic gains its first subscriber and
/// cleared when the last one leaves.
pub struct TopicApplication {
    topics: Mutex<IndexMap<String, Arc<Topic>>>,
    handlers: RwLock<TopicHandlerRegistry>,
    rpc: RwLock<RpcRegistry>,
    topic_timers: Arc<TopicPeriodicTimer>,
    events: Arc<EventDispatcher>,
}

impl TopicApplication {
    pub fn new(topic_timers: Arc<TopicPeriodicTimer>, events: Arc<EventDispatcher>) -> Self {
        Self {
            topics: Mutex::new(IndexMap::new()),
            handlers: RwLock::new(TopicHandlerRegistry::new()),
            rpc: RwLock::new(RpcRegistry::new()),
            topic_timers,
            events,
        }
    }

    pub fn register_topic_handler(&self, pattern: impl Into<String>, handler: Arc<dyn TopicHandler>) {
        self.handlers.write().register(pattern, handler);
    }

    pub fn register_rpc(&self, procedure: impl Into<String>, handler: Arc<dyn RpcHandler>) {
        self.rpc.write().register(procedure, handler);
    }

    pub fn topic(&self, topic_id: &str) -> Option<Arc<Topic>> {
        self.topics.lock().get(topic_id).cloned()
    }

    pub fn topic_ids(&self) -> Vec<String> {
        self.topics.lock().keys().cloned().collect()
    }

    pub fn topic_timers(&self) -> &Arc<TopicPeriodicTimer> {
        &self.topic_timers
    }

    /// Broadcast server-side data to a topic's subscribers.
    pub fn publish(&self, topic_id: &str, data: Value) -> usize {
        let Some(topic) = self.topic(topic_id) else {
            debug!(topic = topic_id, "No subscribers, event dropped");
            return 0;
        };
        let handler = self.handlers.read().resolve(topic_id);
        match handler {
            Some(handler) => {
                handler.on_push(&topic, data);
                topic.len()
            }
            None => topic.broadcast(&data, &[], &[]),
        }
    }

    fn join_topic(&self, conn: &mut Connection, topic_id: &str) {
        let (topic, created) = {
            let mut topics = self.topics.lock();
            match topics.get(topic_id) {
                Some(topic) => (topic.clone(), false),
                None => {
                    let topic = Arc::new(Topic::new(topic_id));
                    topics.insert(topic_id.to_string(), topic.clone());
                    (topic, true)
                }
            }
        };

        if !topic.add(conn.sender().clone()) {
            return;
        }
        conn.wamp.subscriptions.insert(topic_id.to_string());
        debug!(conn_id = conn.id(), topic = topic_id, created, "Subscribed");

        let Some(handler) = self.handlers.read().resolve(topic_id) else {
            return;
        };
        handler.on_subscribe(conn, &topic);

        if !self.topic_timers.is_registered(topic_id) {
            if let Err(e) = handler.register_periodic_timers(&topic, &self.topic_timers) {
                warn!(topic = topic_id, handler = handler.name(), "Failed to register periodic timers: {}", e);
            }
        }
    }

    fn leave_topic(&self, conn: &mut Connection, topic_id: &str) {
        conn.wamp.subscriptions.shift_remove(topic_id);
        let Some(topic) = self.topic(topic_id) else {
            return;
        };
        if !topic.remove(conn.id()) {
            return;
        }
        debug!(conn_id = conn.id(), topic = topic_id, "Unsubscribed");

        let handler = self.handlers.read().resolve(topic_id);
        if let Some(handler) = handler {
            handler.on_unsubscribe(conn, &topic);
        }

        if topic.is_empty() {
            self.topics.lock().shift_remove(topic_id);
            if self.topic_timers.is_registered(topic_id) {
                self.topic_timers.clear_periodic_timer(topic_id);
            }
            debug!(topic = topic_id, "Topic removed");
        }
    }
}

impl WampApplication for TopicApplication {
    fn on_open(&self, conn: &mut Connection) {
        info!(conn_id = conn.id(), remote_addr = %conn.remote_addr(), "Client connected");
        self.events.dispatch_client(&ClientEvent::Connected {
            conn_id: conn.id().to_string(),
            remote_addr: conn.remote_addr(),
        });
    }

    fn on_close(&self, conn: &mut Connection) {
        let subscriptions: Vec<String> = conn.wamp.subscriptions.iter().cloned().collect();
        for topic_id in subscriptions {
            self.leave_topic(conn, &topic_id);
        }

        info!(conn_id = conn.id(), remote_addr = %conn.remote_addr(), "Client disconnected");
        self.events.dispatch_client(&ClientEvent::Disconnected {
            conn_id: conn.id().to_string(),
            remote_addr: conn.remote_addr(),
        });
    }

    fn on_call(&self, conn: &mut Connection, call_id: &str, procedure: &str, args: Vec<Value>) {
        let handler = self.rpc.read().get(procedure);
        let reply = match handler {
            None => WampMessage::CallError {
                call_id: call_id.to_string(),
                error_uri: procedure.to_string(),
                description: "Could not find RPC handler".to_string(),
                details: None,
            },
            Some(handler) => match handler.call(conn, args) {
                Ok(result) => WampMessage::CallResult {
                    call_id: call_id.to_string(),
                    result,
                },
                Err(e) => WampMessage::CallError {
                    call_id: call_id.to_string(),
                    error_uri: e.uri,
                    description: e.description,
                    details: e.details,
                },
            },
        };
        conn.send_wamp(&reply);
    }

    fn on_subscribe(&self, conn: &mut Connection, topic: &str) {
        self.join_topic(conn, topic);
    }

    fn on_unsubscribe(&self, conn: &mut Connection, topic: &str) {
        self.leave_topic(conn, topic);
    }

    fn on_publish(
        &self,
        conn: &mut Connection,
        topic: &str,
        event: Value,
        exclude: PublishExclude,
        eligible: Vec<String>,
    ) {
        let Some(target) = self.topic(topic) else {
            debug!(conn_id = conn.id(), topic, "Publish to topic without subscribers");
            return;
        };

        let exclude = match exclude {
            PublishExclude::None => Vec::new(),
            PublishExclude::Me => vec![conn.wamp.session_id.clone()],
            PublishExclude::Sessions(ids) => ids,
        };

        let handler = self.handlers.read().resolve(topic);
        match handler {
            Some(handler) => handler.on_publish(conn, &target, event, &exclude, &eligible),
            None => {
                target.broadcast(&event, &exclude, &eligible);
            }
        }
    }

    fn on_error(&self, conn: &mut Connection, error: &PipelineError) {
        warn!(conn_id = conn.id(), "Connection error: {}", error);
        self.events.dispatch_client(&ClientEvent::Error {
            conn_id: conn.id().to_string(),
            remote_addr: conn.remote_addr(),
            message: error.to_string(),
        });
    }

    fn on_push(&self, payload: Bytes) {
        let message: PushMessage = match serde_json::from_slice(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(len = payload.len(), "Discarding malformed push payload: {}", e);
                return;
            }
        };
        let sent = self.publish(&message.topic, message.data);
        debug!(topic = %message.topic, sent, "Push delivered");
    }
}

#[cfg(test)]
#[path = "topic_application_tests.rs"]
mod tests;
