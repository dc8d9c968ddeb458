use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::connection::{ConnectionId, ConnectionSender};
use crate::wamp::WampMessage;

/// A pub/sub channel and its subscribers.
#[derive(Debug)]
pub struct Topic {
    id: String,
    subscribers: Mutex<IndexMap<ConnectionId, ConnectionSender>>,
}

impl Topic {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subscribers: Mutex::new(IndexMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns false if the connection was already subscribed.
    pub fn add(&self, sender: ConnectionSender) -> bool {
        let mut subscribers = self.subscribers.lock();
        if subscribers.contains_key(sender.id()) {
            return false;
        }
        subscribers.insert(sender.id().to_string(), sender);
        true
    }

    pub fn remove(&self, conn_id: &str) -> bool {
        self.subscribers.lock().shift_remove(conn_id).is_some()
    }

    pub fn contains(&self, conn_id: &str) -> bool {
        self.subscribers.lock().contains_key(conn_id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    pub fn subscriber_ids(&self) -> Vec<ConnectionId> {
        self.subscribers.lock().keys().cloned().collect()
    }

    /// Send an EVENT to subscribers. A non-empty `eligible` list restricts
    /// the recipients, then `exclude` removes some. Returns how many were
    /// sent.
    pub fn broadcast(&self, event: &Value, exclude: &[String], eligible: &[String]) -> usize {
        let frame = WampMessage::Event {
            topic_uri: self.id.clone(),
            event: event.clone(),
        }
        .encode();

        self.subscribers
            .lock()
            .iter()
            .filter(|(id, _)| eligible.is_empty() || eligible.contains(*id))
            .filter(|(id, _)| !exclude.contains(*id))
            .filter(|(_, sender)| sender.send_text(frame.clone()))
            .count()
    }
}
