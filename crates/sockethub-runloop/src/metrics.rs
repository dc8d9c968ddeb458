//! Counters kept by the RunLoop.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Relaxed counters updated from the loop; read with [`RunLoopMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct RunLoopMetrics {
    iterations: AtomicU64,
    timers_fired: AtomicU64,
    blocks_performed: AtomicU64,
    source1_messages: AtomicU64,
    callback_panics: AtomicU64,
    /// Microseconds spent parked in `wait_for_wakeup`.
    idle_us: AtomicU64,
    wakeups: AtomicU64,
    started: Mutex<Option<(Instant, DateTime<Utc>)>>,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl RunLoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on every loop entry; the last entry wins.
    pub fn mark_start(&self) {
        *self.started.lock() = Some((Instant::now(), Utc::now()));
    }

    pub fn record_iteration(&self) {
        bump(&self.iterations);
    }

    pub fn record_timer_fired(&self) {
        bump(&self.timers_fired);
    }

    pub fn record_block_performed(&self) {
        bump(&self.blocks_performed);
    }

    pub fn record_source1_message(&self) {
        bump(&self.source1_messages);
    }

    pub fn record_callback_panic(&self) {
        bump(&self.callback_panics);
    }

    pub fn record_idle(&self, micros: u64) {
        self.idle_us.fetch_add(micros, Ordering::Relaxed);
        bump(&self.wakeups);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let started = *self.started.lock();
        MetricsSnapshot {
            started_at: started.map(|(_, at)| at),
            uptime_secs: started.map_or(0, |(t, _)| t.elapsed().as_secs()),
            iterations: self.iterations.load(Ordering::Relaxed),
            timers_fired: self.timers_fired.load(Ordering::Relaxed),
            blocks_performed: self.blocks_performed.load(Ordering::Relaxed),
            source1_messages: self.source1_messages.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
            idle_us: self.idle_us.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Wall-clock time of the last loop entry, if the loop ever ran.
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
    pub iterations: u64,
    pub timers_fired: u64,
    pub blocks_performed: u64,
    pub source1_messages: u64,
    pub callback_panics: u64,
    pub idle_us: u64,
    pub wakeups: u64,
}

impl MetricsSnapshot {
    /// Mean time parked per wakeup, in milliseconds.
    pub fn mean_idle_ms(&self) -> f64 {
        if self.wakeups == 0 {
            0.0
        } else {
            self.idle_us as f64 / self.wakeups as f64 / 1000.0
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={} timers={} blocks={} source1={} panics={} uptime={}s",
            self.iterations,
            self.timers_fired,
            self.blocks_performed,
            self.source1_messages,
            self.callback_panics,
            self.uptime_secs
        )
    }
}
