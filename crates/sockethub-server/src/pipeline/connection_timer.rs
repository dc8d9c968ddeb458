use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use sockethub_runloop::{RunLoop, RunLoopResult, TimerHandle};
use tracing::debug;

use super::{ConnectionHandler, Message};
use crate::connection::{Connection, ConnectionId, Handshake};
use crate::error::PipelineError;

/// Named periodic timers owned by one connection.
pub struct ConnectionPeriodicTimer {
    conn_id: ConnectionId,
    run_loop: Arc<RunLoop>,
    timers: IndexMap<String, TimerHandle>,
}

impl ConnectionPeriodicTimer {
    pub fn new(conn_id: impl Into<ConnectionId>, run_loop: Arc<RunLoop>) -> Self {
        Self {
            conn_id: conn_id.into(),
            run_loop,
            timers: IndexMap::new(),
        }
    }

    /// Schedule `callback` every `interval`, replacing a timer of the same name.
    pub fn add_periodic_timer<F>(&mut self, name: &str, interval: Duration, callback: F) -> RunLoopResult<TimerHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = self.run_loop.add_periodic_timer(interval, callback)?;
        if let Some(previous) = self.timers.insert(name.to_string(), handle) {
            self.run_loop.cancel_timer(previous);
        }
        Ok(handle)
    }

    pub fn cancel_periodic_timer(&mut self, name: &str) -> bool {
        match self.timers.shift_remove(name) {
            Some(handle) => self.run_loop.cancel_timer(handle),
            None => false,
        }
    }

    pub fn is_periodic_timer_active(&self, name: &str) -> bool {
        self.timers
            .get(name)
            .is_some_and(|handle| self.run_loop.is_timer_active(*handle))
    }

    pub fn names(&self) -> Vec<&str> {
        self.timers.keys().map(String::as_str).collect()
    }

    /// Cancel every timer. Returns how many were still scheduled.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self
            .timers
            .drain(..)
            .filter(|(_, handle)| self.run_loop.cancel_timer(*handle))
            .count();
        if cancelled > 0 {
            debug!(conn_id = %self.conn_id, cancelled, "Connection timers cancelled");
        }
        cancelled
    }
}

/// Gives every connection a [`ConnectionPeriodicTimer`] and cancels its
/// timers when the connection closes.
pub struct ConnectionTimerHook {
    inner: Arc<dyn ConnectionHandler>,
    run_loop: Arc<RunLoop>,
}

impl ConnectionTimerHook {
    pub fn new(inner: Arc<dyn ConnectionHandler>, run_loop: Arc<RunLoop>) -> Self {
        Self { inner, run_loop }
    }
}

impl ConnectionHandler for ConnectionTimerHook {
    fn on_handshake(&self, handshake: &Handshake) -> Result<(), PipelineError> {
        self.inner.on_handshake(handshake)
    }

    fn on_open(&self, conn: &mut Connection) -> Result<(), PipelineError> {
        conn.periodic_timers = Some(ConnectionPeriodicTimer::new(conn.id(), self.run_loop.clone()));
        self.inner.on_open(conn)
    }

    fn on_message(&self, conn: &mut Connection, message: Message) -> Result<(), PipelineError> {
        self.inner.on_message(conn, message)
    }

    fn on_close(&self, conn: &mut Connection) {
        if let Some(timers) = conn.periodic_timers.as_mut() {
            timers.cancel_all();
        }
        self.inner.on_close(conn)
    }

    fn on_error(&self, conn: &mut Connection, error: &PipelineError) {
        self.inner.on_error(conn, error)
    }
}
