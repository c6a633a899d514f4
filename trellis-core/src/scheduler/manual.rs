//! Manual Scheduler
//!
//! Actions wait in a FIFO queue until the owner calls [`ManualScheduler::flush`].
//! This is the scheduler tests use to control exactly when effects run.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{Action, CancelAction, Scheduler};
use crate::error::{panic_message, ActionPanic, FlushError};

/// A caller-driven FIFO scheduler.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<Queue>>,
}

#[derive(Default)]
struct Queue {
    /// Sequence number handed to the next scheduled action.
    next: u64,
    actions: BTreeMap<u64, Action>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every action that was queued when the flush started, in schedule
    /// order.
    ///
    /// Actions scheduled while flushing stay queued for the next flush.
    /// Actions canceled while flushing do not run. A panicking action does
    /// not stop the flush; every panic is collected and returned together
    /// once the batch has drained.
    pub fn flush(&self) -> Result<usize, FlushError> {
        let boundary = self.queue.lock().next;
        let mut executed = 0;
        let mut failures = Vec::new();

        loop {
            let next = {
                let mut queue = self.queue.lock();
                match queue.actions.first_key_value() {
                    Some((&seq, _)) if seq < boundary => queue.actions.pop_first(),
                    _ => None,
                }
            };
            let Some((_, action)) = next else { break };

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(action)) {
                failures.push(ActionPanic {
                    index: executed,
                    message: panic_message(payload.as_ref()),
                });
            }
            executed += 1;
        }

        tracing::debug!(executed, failed = failures.len(), "manual flush");
        if failures.is_empty() {
            Ok(executed)
        } else {
            Err(FlushError { executed, failures })
        }
    }

    /// Number of actions waiting for a flush.
    pub fn len(&self) -> usize {
        self.queue.lock().actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, action: Action) -> CancelAction {
        let seq = {
            let mut queue = self.queue.lock();
            let seq = queue.next;
            queue.next += 1;
            queue.actions.insert(seq, action);
            seq
        };
        tracing::trace!(seq, "manual action queued");

        let queue: Weak<Mutex<Queue>> = Arc::downgrade(&self.queue);
        CancelAction::new(move || {
            if let Some(queue) = queue.upgrade() {
                let removed = queue.lock().actions.remove(&seq);
                drop(removed);
            }
        })
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("queued", &self.len())
            .finish()
    }
}
