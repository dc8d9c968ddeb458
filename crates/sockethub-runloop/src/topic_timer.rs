//! Per-topic periodic timers.
//!
//! Topic handlers register recurring work under `(topic, name)` keys. The
//! registry owns every handle it creates; the RunLoop only executes them.
//! Each key moves through `absent -> scheduled -> absent`.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RunLoopResult;
use crate::run_loop::RunLoop;
use crate::timer::TimerHandle;

/// Policies for clearing and emptying topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTimerOptions {
    /// Cancel every loop timer of a topic on `clear_periodic_timer`. When
    /// false, clearing only forgets the handles and the callbacks keep
    /// firing.
    pub cancel_on_clear: bool,

    /// Keep an empty topic entry after its last timer is cancelled, so
    /// `is_registered` stays true until the topic is cleared.
    pub retain_empty_topics: bool,
}

impl Default for TopicTimerOptions {
    fn default() -> Self {
        Self {
            cancel_on_clear: true,
            retain_empty_topics: true,
        }
    }
}

/// Snapshot of one topic's timers, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTimers {
    pub topic: String,
    pub timers: Vec<(String, TimerHandle)>,
}

type Registry = IndexMap<String, IndexMap<String, TimerHandle>>;

/// Registry of periodic timers keyed by topic, then by timer name.
pub struct TopicPeriodicTimer {
    run_loop: Arc<RunLoop>,
    options: TopicTimerOptions,
    registry: Mutex<Registry>,
}

impl TopicPeriodicTimer {
    pub fn new(run_loop: Arc<RunLoop>, options: TopicTimerOptions) -> Self {
        Self {
            run_loop,
            options,
            registry: Mutex::new(IndexMap::new()),
        }
    }

    pub fn options(&self) -> TopicTimerOptions {
        self.options
    }

    /// Schedule `callback` every `interval` under `(topic, name)`.
    ///
    /// An existing timer with the same key is cancelled and replaced.
    pub fn add_periodic_timer<F>(
        &self,
        topic: &str,
        name: &str,
        interval: Duration,
        callback: F,
    ) -> RunLoopResult<TimerHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = self.run_loop.add_periodic_timer(interval, callback)?;

        let previous = self
            .registry
            .lock()
            .entry(topic.to_string())
            .or_default()
            .insert(name.to_string(), handle);

        if let Some(previous) = previous {
            self.run_loop.cancel_timer(previous);
            debug!(topic, name, "Replaced periodic timer {}", previous);
        }
        debug!(topic, name, "Periodic timer {} registered every {:?}", handle, interval);

        Ok(handle)
    }

    /// Whether the topic has an entry in the registry.
    pub fn is_registered(&self, topic: &str) -> bool {
        self.registry.lock().contains_key(topic)
    }

    /// Whether `(topic, name)` has a live handle.
    pub fn is_periodic_timer_active(&self, topic: &str, name: &str) -> bool {
        self.registry
            .lock()
            .get(topic)
            .and_then(|timers| timers.get(name))
            .is_some_and(|handle| self.run_loop.is_timer_active(*handle))
    }

    /// Timers registered for a topic.
    pub fn periodic_timers(&self, topic: &str) -> Vec<(String, TimerHandle)> {
        self.registry
            .lock()
            .get(topic)
            .map(|timers| timers.iter().map(|(n, h)| (n.clone(), *h)).collect())
            .unwrap_or_default()
    }

    /// Cancel and forget one timer. No-op if absent.
    pub fn cancel_periodic_timer(&self, topic: &str, name: &str) {
        let removed = {
            let mut registry = self.registry.lock();
            let Some(timers) = registry.get_mut(topic) else {
                return;
            };
            let removed = timers.shift_remove(name);
            if timers.is_empty() && !self.options.retain_empty_topics {
                registry.shift_remove(topic);
            }
            removed
        };

        if let Some(handle) = removed {
            self.run_loop.cancel_timer(handle);
            debug!(topic, name, "Periodic timer {} cancelled", handle);
        }
    }

    /// Forget every timer of a topic, cancelling them unless
    /// `cancel_on_clear` is off. No-op if absent.
    pub fn clear_periodic_timer(&self, topic: &str) {
        let Some(timers) = self.registry.lock().shift_remove(topic) else {
            return;
        };

        if self.options.cancel_on_clear {
            for handle in timers.values() {
                self.run_loop.cancel_timer(*handle);
            }
        }
        debug!(topic, count = timers.len(), "Periodic timers cleared");
    }

    /// Diagnostic traversal in topic insertion order.
    pub fn entries(&self) -> Vec<TopicTimers> {
        self.registry
            .lock()
            .iter()
            .map(|(topic, timers)| TopicTimers {
                topic: topic.clone(),
                timers: timers.iter().map(|(n, h)| (n.clone(), *h)).collect(),
            })
            .collect()
    }

    pub fn topic_count(&self) -> usize {
        self.registry.lock().len()
    }
}

#[cfg(test)]
#[path = "topic_timer_tests.rs"]
mod tests;
