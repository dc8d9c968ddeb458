//! RunLoop wakeup waiting and Source1 activity monitoring.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::run_loop::{RunLoop, WakeupSignal};
use crate::source::PortMessage;

impl RunLoop {
    /// Sleep until a wakeup signal, a Source1 message, the next timer
    /// deadline or the run deadline, whichever comes first.
    pub(crate) async fn wait_for_wakeup(&self, deadline: Option<Instant>) -> WakeupSignal {
        let wake_at = match (self.next_timer_deadline(), deadline) {
            (Some(timer), Some(run)) => Some(timer.min(run)),
            (timer, run) => timer.or(run),
        };

        let mut wakeup_rx = self.wakeup_rx.lock().await;

        tokio::select! {
            // Explicit wakeup signal
            Some(signal) = wakeup_rx.recv() => signal,

            // Source1 activity
            Some((source_id, message)) = self.wait_source1_activity() => {
                WakeupSignal::SourceReady { source_id, message }
            }

            // Timer or run deadline
            _ = sleep_until(wake_at) => {
                WakeupSignal::Explicit {
                    reason: "timeout".to_string(),
                }
            }
        }
    }

    /// Wait for Source1 activity.
    ///
    /// Waits on all Source1 receivers concurrently, without polling.
    pub(crate) async fn wait_source1_activity(&self) -> Option<(String, PortMessage)> {
        use futures::stream::{FuturesUnordered, StreamExt};

        let receiver_infos: Vec<(String, Arc<Mutex<mpsc::Receiver<PortMessage>>>)> = self
            .source1_receivers
            .read()
            .iter()
            .filter(|r| r.source.is_valid())
            .map(|r| (r.source.id().to_string(), r.receiver_arc()))
            .collect();

        if receiver_infos.is_empty() {
            return std::future::pending().await;
        }

        let mut futures: FuturesUnordered<_> = receiver_infos
            .into_iter()
            .map(|(source_id, receiver_arc)| async move {
                let mut guard = receiver_arc.lock().await;
                guard.recv().await.map(|msg| (source_id, msg))
            })
            .collect();

        while let Some(result) = futures.next().await {
            if result.is_some() {
                return result;
            }
        }

        // All channels closed
        None
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
