//! Process-wide periodic callbacks.
//!
//! A [`Periodic`] is scheduled once at startup and runs for the lifetime of
//! the process. The registry keeps them in insertion order, which is also
//! the order they are scheduled on the RunLoop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::RunLoopResult;
use crate::run_loop::RunLoop;
use crate::timer::TimerHandle;

/// Recurring work scheduled on the RunLoop at startup.
pub trait Periodic: Send + Sync {
    /// Run one tick.
    fn tick(&self) -> anyhow::Result<()>;

    /// Interval between ticks.
    fn timeout(&self) -> Duration;

    /// Name used in log lines.
    fn display_name(&self) -> &str;
}

/// Ordered set of process-wide periodics.
#[derive(Default, Clone)]
pub struct PeriodicRegistry {
    periodics: Vec<Arc<dyn Periodic>>,
}

impl PeriodicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a periodic.
    pub fn add_periodic(&mut self, periodic: Arc<dyn Periodic>) {
        self.periodics.push(periodic);
    }

    /// Insert a periodic ahead of every registered one.
    pub fn add_periodic_first(&mut self, periodic: Arc<dyn Periodic>) {
        self.periodics.insert(0, periodic);
    }

    /// Periodics in scheduling order.
    pub fn periodics(&self) -> &[Arc<dyn Periodic>] {
        &self.periodics
    }

    pub fn contains(&self, display_name: &str) -> bool {
        self.periodics
            .iter()
            .any(|p| p.display_name() == display_name)
    }

    pub fn len(&self) -> usize {
        self.periodics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periodics.is_empty()
    }
}

impl fmt::Debug for PeriodicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.periodics.iter().map(|p| p.display_name()))
            .finish()
    }
}

/// Schedule a periodic on the RunLoop at its declared interval.
///
/// A failing tick is logged and the timer keeps running.
pub fn schedule_periodic(run_loop: &RunLoop, periodic: Arc<dyn Periodic>) -> RunLoopResult<TimerHandle> {
    let interval = periodic.timeout();
    run_loop.add_periodic_timer(interval, move || {
        if let Err(e) = periodic.tick() {
            warn!("Periodic {} tick failed: {:#}", periodic.display_name(), e);
        }
    })
}

#[cfg(test)]
#[path = "periodic_tests.rs"]
mod tests;
