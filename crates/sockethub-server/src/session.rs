//! HTTP session binding.
//!
//! The session stage reads the session cookie from the upgrade request and
//! loads the matching data through a [`SessionHandler`]. Sessions are
//! read-only from the socket side.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;

pub type SessionData = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Storage backend for HTTP sessions.
pub trait SessionHandler: Send + Sync {
    /// Load session data. `Ok(None)` for unknown ids.
    fn read(&self, session_id: &str) -> Result<Option<SessionData>, SessionError>;

    fn name(&self) -> &str;
}

/// Handler that never finds a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSessionHandler;

impl SessionHandler for NullSessionHandler {
    fn read(&self, _session_id: &str) -> Result<Option<SessionData>, SessionError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionHandler {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl MemorySessionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, session_id: impl Into<String>, data: SessionData) {
        self.sessions.write().insert(session_id.into(), data);
    }

    pub fn destroy(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionHandler for MemorySessionHandler {
    fn read(&self, session_id: &str) -> Result<Option<SessionData>, SessionError> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Session bound to a connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    id: Option<String>,
    data: SessionData,
}

impl Session {
    pub fn new(id: impl Into<String>, data: SessionData) -> Self {
        Self {
            id: Some(id.into()),
            data,
        }
    }

    /// Session for a request without a session cookie.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }
}
