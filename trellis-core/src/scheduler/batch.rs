//! Ordered action batches for host-driven schedulers.
//!
//! Hosts give no ordering guarantee between separately spawned callbacks
//! (tokio's multi-thread workers run the newest task first). Schedulers
//! therefore queue actions here and ask the host for a single drain at a
//! time. At most one drain is requested or running at any moment, so actions
//! leave the batch in the order they entered it.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::Action;

#[derive(Default)]
pub(crate) struct Batch {
    state: Mutex<BatchState>,
}

#[derive(Default)]
struct BatchState {
    actions: VecDeque<Action>,
    /// A drain has been requested from the host and has not finished.
    requested: bool,
}

impl Batch {
    /// Queue `action`. Returns `true` when the caller must request a drain.
    pub fn push(&self, action: Action) -> bool {
        let mut state = self.state.lock();
        state.actions.push_back(action);
        !std::mem::replace(&mut state.requested, true)
    }

    /// Run every action queued before the drain started, in order.
    ///
    /// Returns `true` when more actions arrived meanwhile; the drain stays
    /// requested and the caller must ask the host for another one.
    pub fn drain(&self) -> bool {
        let actions = std::mem::take(&mut self.state.lock().actions);
        for action in actions {
            action();
        }

        let mut state = self.state.lock();
        state.requested = !state.actions.is_empty();
        state.requested
    }

    pub fn len(&self) -> usize {
        self.state.lock().actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn logging(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Action {
        let log = log.clone();
        Box::new(move || log.lock().push(value))
    }

    #[test]
    fn only_first_push_requests_a_drain() {
        let batch = Batch::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        assert!(batch.push(logging(&log, 1)));
        assert!(!batch.push(logging(&log, 2)));
        assert_eq!(batch.len(), 2);

        assert!(!batch.drain());
        assert_eq!(*log.lock(), vec![1, 2]);

        // The next push after a finished drain requests a new one.
        assert!(batch.push(logging(&log, 3)));
    }

    #[test]
    fn actions_queued_during_drain_wait_for_the_next_one() {
        let batch = Arc::new(Batch::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let (inner, inner_log) = (batch.clone(), log.clone());
        batch.push(Box::new(move || {
            inner_log.lock().push(1);
            assert!(!inner.push(logging(&inner_log, 2)));
        }));

        assert!(batch.drain());
        assert_eq!(*log.lock(), vec![1]);

        assert!(!batch.drain());
        assert_eq!(*log.lock(), vec![1, 2]);
    }
}
