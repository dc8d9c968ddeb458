//! RunLoop core implementation.
//!
//! The RunLoop is the single execution context of the server: socket
//! events, timers and the push transport are all dispatched from here.

use std::collections::VecDeque;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::config::RunLoopConfig;
use crate::metrics::RunLoopMetrics;
use crate::mode::RunLoopState;
use crate::source::{PortMessage, Source1Receiver};
use crate::timer::TimerQueue;

/// Wakeup signal for the RunLoop.
///
/// Similar to Mach Message in iOS.
#[derive(Debug, Clone)]
pub enum WakeupSignal {
    /// Source1 has a message ready.
    SourceReady {
        source_id: String,
        message: PortMessage,
    },
    /// Explicit wakeup request.
    Explicit { reason: String },
    /// Stop the RunLoop.
    Stop,
}

/// Closure posted with [`RunLoop::perform`].
pub(crate) type Block = Box<dyn FnOnce() + Send>;

/// The RunLoop manages the event loop for SocketHub.
///
/// Work is run to completion one callback at a time; nothing suspends in
/// the middle of a timer, block or source handler.
pub struct RunLoop {
    /// Current state.
    pub(crate) state: AtomicU8,

    /// Wakeup channel sender.
    pub(crate) wakeup_tx: mpsc::Sender<WakeupSignal>,

    /// Wakeup channel receiver.
    pub(crate) wakeup_rx: tokio::sync::Mutex<mpsc::Receiver<WakeupSignal>>,

    /// Scheduled timers.
    pub(crate) timers: Mutex<TimerQueue>,

    /// Pending blocks.
    pub(crate) blocks: Mutex<VecDeque<Block>>,

    /// Source1 receivers.
    pub(crate) source1_receivers: RwLock<Vec<Source1Receiver>>,

    /// Configuration.
    pub(crate) config: RunLoopConfig,

    /// Metrics.
    pub(crate) metrics: Arc<RunLoopMetrics>,
}

impl RunLoop {
    /// Create a new RunLoop.
    pub fn new(config: RunLoopConfig) -> Self {
        let (wakeup_tx, wakeup_rx) = mpsc::channel(config.wakeup_capacity.max(1));

        Self {
            state: AtomicU8::new(RunLoopState::Created as u8),
            wakeup_tx,
            wakeup_rx: tokio::sync::Mutex::new(wakeup_rx),
            timers: Mutex::new(TimerQueue::new()),
            blocks: Mutex::new(VecDeque::new()),
            source1_receivers: RwLock::new(Vec::new()),
            config,
            metrics: Arc::new(RunLoopMetrics::new()),
        }
    }
}

impl Default for RunLoop {
    fn default() -> Self {
        Self::new(RunLoopConfig::default())
    }
}

#[cfg(test)]
#[path = "run_loop_tests.rs"]
mod tests;
