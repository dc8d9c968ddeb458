//! State queries and stop/wakeup control.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::config::RunLoopConfig;
use crate::metrics::RunLoopMetrics;
use crate::mode::RunLoopState;
use crate::run_loop::{RunLoop, WakeupSignal};

impl RunLoop {
    pub fn state(&self) -> RunLoopState {
        RunLoopState::from(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: RunLoopState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Whether a `run` call is executing.
    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    pub fn config(&self) -> &RunLoopConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<RunLoopMetrics> {
        &self.metrics
    }

    /// Wakeup the RunLoop. Similar to CFRunLoopWakeUp.
    pub fn wakeup(&self, reason: impl Into<String>) {
        let _ = self.wakeup_tx.try_send(WakeupSignal::Explicit {
            reason: reason.into(),
        });
    }

    /// Stop the RunLoop. Similar to CFRunLoopStop.
    ///
    /// A stop requested before `run` makes the next `run` return
    /// immediately.
    pub fn stop(&self) {
        self.set_state(RunLoopState::Stopping);
        let _ = self.wakeup_tx.try_send(WakeupSignal::Stop);
    }
}
