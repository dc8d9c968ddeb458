use std::sync::Arc;

use serde_json::Value;
use sockethub_runloop::{RunLoopResult, TopicPeriodicTimer};

use super::topic::Topic;
use crate::connection::Connection;

/// Per-topic behaviour. The defaults broadcast to every subscriber.
pub trait TopicHandler: Send + Sync {
    fn name(&self) -> &str;

    fn on_subscribe(&self, _conn: &mut Connection, _topic: &Arc<Topic>) {}

    fn on_unsubscribe(&self, _conn: &mut Connection, _topic: &Arc<Topic>) {}

    fn on_publish(
        &self,
        _conn: &mut Connection,
        topic: &Arc<Topic>,
        event: Value,
        exclude: &[String],
        eligible: &[String],
    ) {
        topic.broadcast(&event, exclude, eligible);
    }

    fn on_push(&self, topic: &Arc<Topic>, data: Value) {
        topic.broadcast(&data, &[], &[]);
    }

    /// Declare recurring work for a topic. Called when a topic gains its
    /// first subscriber and has no registered timers.
    fn register_periodic_timers(&self, _topic: &Arc<Topic>, _timers: &TopicPeriodicTimer) -> RunLoopResult<()> {
        Ok(())
    }
}

/// Resolves topics to handlers by exact URI or by `prefix*` pattern.
#[derive(Default, Clone)]
pub struct TopicHandlerRegistry {
    handlers: Vec<(String, Arc<dyn TopicHandler>)>,
}

impl TopicHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A pattern ending in `*` matches every topic
    /// starting with the text before it.
    pub fn register(&mut self, pattern: impl Into<String>, handler: Arc<dyn TopicHandler>) {
        let pattern = pattern.into();
        self.handlers.retain(|(p, _)| *p != pattern);
        self.handlers.push((pattern, handler));
    }

    /// Exact match first, then the longest matching wildcard.
    pub fn resolve(&self, topic: &str) -> Option<Arc<dyn TopicHandler>> {
        if let Some((_, handler)) = self.handlers.iter().find(|(p, _)| p == topic) {
            return Some(handler.clone());
        }

        self.handlers
            .iter()
            .filter_map(|(p, handler)| {
                let prefix = p.strip_suffix('*')?;
                topic.starts_with(prefix).then_some((prefix.len(), handler))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, handler)| handler.clone())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
