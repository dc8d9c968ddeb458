//! RunLoop event loop execution (`run` and `run_for`).

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{RunLoopError, RunLoopResult};
use crate::mode::{RunLoopRunResult, RunLoopState};
use crate::run_loop::{RunLoop, WakeupSignal};

impl RunLoop {
    /// Run the RunLoop until [`RunLoop::stop`] is called.
    pub async fn run(&self) -> RunLoopResult<()> {
        self.run_until(None).await?;
        Ok(())
    }

    /// Run the RunLoop for at most `timeout`.
    ///
    /// Returns when stopped or timed out.
    pub async fn run_for(&self, timeout: Duration) -> RunLoopResult<RunLoopRunResult> {
        self.run_until(Instant::now().checked_add(timeout)).await
    }

    async fn run_until(&self, deadline: Option<Instant>) -> RunLoopResult<RunLoopRunResult> {
        if !self.enter()? {
            debug!("RunLoop: stop requested before entry");
            return Ok(RunLoopRunResult::Stopped);
        }
        self.metrics.mark_start();
        debug!("RunLoop: Entry");

        let result = loop {
            self.metrics.record_iteration();

            if self.state() == RunLoopState::Stopping {
                break RunLoopRunResult::Stopped;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break RunLoopRunResult::TimedOut;
            }

            self.fire_due_timers();
            self.perform_blocks();

            if self.try_process_source1() || self.has_pending_blocks() {
                continue;
            }

            let _ = self.state.compare_exchange(
                RunLoopState::Running as u8,
                RunLoopState::Waiting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );

            let wait_start = std::time::Instant::now();
            let wakeup = self.wait_for_wakeup(deadline).await;
            self.metrics.record_idle(wait_start.elapsed().as_micros() as u64);

            let _ = self.state.compare_exchange(
                RunLoopState::Waiting as u8,
                RunLoopState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );

            match wakeup {
                WakeupSignal::Stop => break RunLoopRunResult::Stopped,
                WakeupSignal::SourceReady { source_id, message } => {
                    debug!("Source1 ready: {}", source_id);
                    self.handle_source1_message(&source_id, message);
                }
                WakeupSignal::Explicit { reason } => {
                    debug!("Explicit wakeup: {}", reason);
                }
            }
        };

        self.set_state(RunLoopState::Stopped);
        debug!("RunLoop: Exit ({:?}) {}", result, self.metrics.snapshot());
        if result == RunLoopRunResult::Stopped {
            info!("RunLoop stopped");
        }
        Ok(result)
    }

    /// Transition into `Running`. Returns `Ok(false)` if a stop was
    /// requested before the loop started.
    fn enter(&self) -> RunLoopResult<bool> {
        let current = self.state();
        if current.is_active() {
            return Err(RunLoopError::AlreadyRunning);
        }
        if self
            .state
            .compare_exchange(
                current as u8,
                RunLoopState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(RunLoopError::AlreadyRunning);
        }

        if let Ok(mut rx) = self.wakeup_rx.try_lock() {
            while rx.try_recv().is_ok() {}
        }

        if current == RunLoopState::Stopping {
            self.set_state(RunLoopState::Stopped);
            return Ok(false);
        }
        Ok(true)
    }
}
