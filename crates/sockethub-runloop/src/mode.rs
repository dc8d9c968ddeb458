//! RunLoop state and run results.

use serde::{Deserialize, Serialize};

/// RunLoop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunLoopState {
    /// Initial state, not started.
    Created = 0,
    /// Running and processing events.
    Running = 1,
    /// Waiting/sleeping for events.
    Waiting = 2,
    /// Stop requested.
    Stopping = 3,
    /// Stopped.
    Stopped = 4,
}

impl From<u8> for RunLoopState {
    fn from(v: u8) -> Self {
        match v {
            1 => RunLoopState::Running,
            2 => RunLoopState::Waiting,
            3 => RunLoopState::Stopping,
            4 => RunLoopState::Stopped,
            _ => RunLoopState::Created,
        }
    }
}

impl RunLoopState {
    /// Whether a `run` call is currently executing.
    pub fn is_active(&self) -> bool {
        matches!(self, RunLoopState::Running | RunLoopState::Waiting)
    }
}

impl std::fmt::Display for RunLoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunLoopState::Created => write!(f, "created"),
            RunLoopState::Running => write!(f, "running"),
            RunLoopState::Waiting => write!(f, "waiting"),
            RunLoopState::Stopping => write!(f, "stopping"),
            RunLoopState::Stopped => write!(f, "stopped"),
        }
    }
}

/// How a `run_for` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLoopRunResult {
    /// RunLoop was stopped.
    Stopped,
    /// RunLoop timed out.
    TimedOut,
}
