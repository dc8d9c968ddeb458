//! RunLoop timer registration and firing.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{RunLoopError, RunLoopResult};
use crate::run_loop::RunLoop;
use crate::timer::TimerHandle;

impl RunLoop {
    /// Schedule a one-shot timer. Similar to CFRunLoopAddTimer with a zero
    /// repeat interval. A delay too large to represent never fires.
    pub fn add_timer<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = self
            .timers
            .lock()
            .schedule(Instant::now(), delay, None, Arc::new(callback));
        debug!("Timer {} scheduled in {:?}", handle, delay);
        self.wakeup("timer_added");
        handle
    }

    /// Schedule `callback` every `interval`, first firing one interval from
    /// now.
    ///
    /// Fails with `InvalidInterval` for a zero interval or one whose first
    /// deadline cannot be represented.
    pub fn add_periodic_timer<F>(&self, interval: Duration, callback: F) -> RunLoopResult<TimerHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let now = Instant::now();
        if interval.is_zero() || now.checked_add(interval).is_none() {
            return Err(RunLoopError::InvalidInterval(interval));
        }

        let handle = self.timers.lock().schedule(
            now,
            interval,
            Some(interval),
            Arc::new(callback),
        );
        debug!("Periodic timer {} scheduled every {:?}", handle, interval);
        self.wakeup("timer_added");
        Ok(handle)
    }

    /// Cancel a timer. Once this returns the callback will not run again.
    ///
    /// Returns false if the timer was not scheduled (already cancelled or a
    /// finished one-shot).
    pub fn cancel_timer(&self, handle: TimerHandle) -> bool {
        let cancelled = self.timers.lock().cancel(handle);
        if cancelled {
            debug!("Timer {} cancelled", handle);
        }
        cancelled
    }

    /// Check whether a timer is still scheduled.
    pub fn is_timer_active(&self, handle: TimerHandle) -> bool {
        self.timers.lock().contains(handle)
    }

    /// Number of scheduled timers.
    pub fn timer_count(&self) -> usize {
        self.timers.lock().len()
    }

    pub(crate) fn next_timer_deadline(&self) -> Option<Instant> {
        self.timers.lock().next_deadline()
    }

    /// Fire every timer due now, in deadline then registration order.
    ///
    /// Timers are popped one at a time and the lock is released before the
    /// callback runs, so a callback may cancel or add timers (including ones
    /// due in this same pass).
    pub(crate) fn fire_due_timers(&self) -> usize {
        let now = Instant::now();
        let mut fired = 0;

        loop {
            let due = self.timers.lock().pop_due(now);
            let Some((handle, callback)) = due else {
                break;
            };

            fired += 1;
            if self.config.metrics_enabled {
                self.metrics.record_timer_fired();
            }
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!("Timer {} callback panicked", handle);
                self.metrics.record_callback_panic();
            }
        }

        fired
    }
}
