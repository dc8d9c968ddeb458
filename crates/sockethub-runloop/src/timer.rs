//! Timer storage for the RunLoop.
//!
//! Timers are kept in a deadline-ordered schedule keyed by
//! `(deadline, sequence)`. The sequence number is assigned once at
//! registration, so timers due at the same instant fire in the order they
//! were registered, on every tick.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Callback invoked when a timer fires.
pub(crate) type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Opaque, loop-owned handle to a scheduled timer.
///
/// Handles are never reused within a RunLoop, so a stale handle can be
/// cancelled or queried safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Numeric identifier, unique per RunLoop.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

struct TimerEntry {
    callback: TimerCallback,
    interval: Option<Duration>,
    /// `None` parks the timer: its deadline is past what `Instant` can hold.
    deadline: Option<Instant>,
    seq: u64,
}

/// Deadline-ordered timer set.
#[derive(Default)]
pub(crate) struct TimerQueue {
    next_id: u64,
    entries: HashMap<TimerHandle, TimerEntry>,
    schedule: BTreeMap<(Instant, u64), TimerHandle>,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer that first fires after `delay`. A `Some` interval
    /// makes it recurring.
    pub(crate) fn schedule(
        &mut self,
        now: Instant,
        delay: Duration,
        interval: Option<Duration>,
        callback: TimerCallback,
    ) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let seq = self.next_id;
        let deadline = now.checked_add(delay);

        if let Some(deadline) = deadline {
            self.schedule.insert((deadline, seq), handle);
        }
        self.entries.insert(
            handle,
            TimerEntry {
                callback,
                interval,
                deadline,
                seq,
            },
        );
        handle
    }

    /// Remove a timer. Returns false if it was not scheduled.
    pub(crate) fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.entries.remove(&handle) {
            Some(entry) => {
                if let Some(deadline) = entry.deadline {
                    self.schedule.remove(&(deadline, entry.seq));
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, handle: TimerHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.schedule.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Take the earliest timer due at `now`.
    ///
    /// Recurring timers are rescheduled one interval after their previous
    /// deadline; a timer that fell behind restarts from `now` instead of
    /// firing a burst of missed ticks. One-shot timers are removed. A
    /// recurring timer whose next deadline overflows stays registered but
    /// never fires again.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<(TimerHandle, TimerCallback)> {
        let (&key, &handle) = self.schedule.iter().next()?;
        if key.0 > now {
            return None;
        }
        self.schedule.remove(&key);

        let entry = self.entries.get_mut(&handle)?;
        let callback = entry.callback.clone();

        match entry.interval {
            Some(interval) => {
                let next = key
                    .0
                    .checked_add(interval)
                    .filter(|next| *next > now)
                    .or_else(|| now.checked_add(interval));
                entry.deadline = next;
                if let Some(next) = next {
                    self.schedule.insert((next, entry.seq), handle);
                }
            }
            None => {
                self.entries.remove(&handle);
            }
        }

        Some((handle, callback))
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
