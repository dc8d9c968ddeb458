//! RunLoop block and Source1 processing.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, warn};

use crate::run_loop::RunLoop;
use crate::source::{PortMessage, Source1Receiver};

impl RunLoop {
    /// Enqueue a block to run on the RunLoop. Similar to
    /// CFRunLoopPerformBlock followed by CFRunLoopWakeUp.
    ///
    /// Blocks run in the order they were posted.
    pub fn perform<F>(&self, block: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.blocks.lock().push_back(Box::new(block));
        self.wakeup("perform");
    }

    /// Add a Source1 receiver.
    pub fn add_source1(&self, receiver: Source1Receiver) {
        debug!("Source1 {} added", receiver.source.id());
        self.source1_receivers.write().push(receiver);
        self.wakeup("source1_added");
    }

    /// Remove a Source1 by ID.
    pub fn remove_source1(&self, source_id: &str) {
        self.source1_receivers
            .write()
            .retain(|r| r.source.id() != source_id);
    }

    pub(crate) fn has_pending_blocks(&self) -> bool {
        !self.blocks.lock().is_empty()
    }

    /// Run the blocks queued so far. Blocks posted while these run are
    /// left for the next iteration.
    pub(crate) fn perform_blocks(&self) -> usize {
        let blocks = std::mem::take(&mut *self.blocks.lock());
        let count = blocks.len();

        for block in blocks {
            if self.config.metrics_enabled {
                self.metrics.record_block_performed();
            }
            if catch_unwind(AssertUnwindSafe(block)).is_err() {
                error!("RunLoop block panicked");
                self.metrics.record_callback_panic();
            }
        }

        count
    }

    /// Try to process one Source1 message (non-blocking).
    pub(crate) fn try_process_source1(&self) -> bool {
        let pending = {
            let receivers = self.source1_receivers.read();
            receivers
                .iter()
                .filter(|r| r.source.is_valid())
                .find_map(|r| r.try_recv().map(|msg| (r.source.clone(), msg)))
        };

        match pending {
            Some((source, msg)) => {
                self.dispatch_source1(source.as_ref(), msg);
                true
            }
            None => {
                self.source1_receivers.write().retain(|r| r.source.is_valid());
                false
            }
        }
    }

    /// Handle a Source1 message received while waiting.
    pub(crate) fn handle_source1_message(&self, source_id: &str, message: PortMessage) {
        let source = self
            .source1_receivers
            .read()
            .iter()
            .find(|r| r.source.id() == source_id && r.source.is_valid())
            .map(|r| r.source.clone());

        match source {
            Some(source) => self.dispatch_source1(source.as_ref(), message),
            None => debug!("No receiver found for source: {}", source_id),
        }
    }

    fn dispatch_source1(&self, source: &dyn crate::source::Source1, msg: PortMessage) {
        if self.config.metrics_enabled {
            self.metrics.record_source1_message();
        }
        match catch_unwind(AssertUnwindSafe(|| source.handle(msg))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Source1 {} handle error: {}", source.id(), e),
            Err(_) => {
                error!("Source1 {} handler panicked", source.id());
                self.metrics.record_callback_panic();
            }
        }
    }
}
