//! Stability Tracker
//!
//! Wraps schedulers to count scheduled-but-unfinished actions, so callers can
//! ask whether any work is still outstanding or wait until none is.
//!
//! # Counting
//!
//! Every `schedule` call on a wrapped scheduler adds one pending action. The
//! count drops exactly once per call: after the action finishes running
//! (even if it panics), or when it is canceled. Canceling after execution,
//! or canceling twice, changes nothing.
//!
//! # Waiting
//!
//! [`StabilityTracker::stable`] resolves once the count reaches zero. Work
//! finishing can immediately trigger new work (an action whose completion
//! spawns a task that schedules again), so the count may be non-zero again by
//! the time the waiter resumes. The waiter therefore re-checks after every
//! wake-up and goes back to sleep until it observes zero itself.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{Action, CancelAction, Scheduler};

/// Observes quiescence across any number of wrapped schedulers.
///
/// Cloning the tracker shares the same counter and wrapper cache.
#[derive(Clone, Default)]
pub struct StabilityTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Default)]
struct TrackerInner {
    pending: Arc<Pending>,
    /// Live wrappers keyed by the address of the scheduler they wrap. A live
    /// wrapper keeps its scheduler alive, so the address of a live entry is
    /// never reused. Entries whose wrapper was dropped are pruned on `wrap`.
    wrapped: DashMap<usize, Weak<TrackedScheduler>>,
}

#[derive(Default)]
struct Pending {
    count: AtomicUsize,
    settled: Notify,
}

impl Pending {
    fn start(self: &Arc<Self>) -> PendingGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        PendingGuard {
            pending: Arc::clone(self),
        }
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            tracing::trace!("all scheduled work settled");
            self.settled.notify_waiters();
        }
    }

    fn is_zero(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }
}

/// One outstanding action. Dropping it settles the action.
struct PendingGuard {
    pending: Arc<Pending>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.finish();
    }
}

struct TrackedScheduler {
    scheduler: Arc<dyn Scheduler>,
    pending: Arc<Pending>,
}

impl Scheduler for TrackedScheduler {
    fn schedule(&self, action: Action) -> CancelAction {
        let guard = Arc::new(Mutex::new(Some(self.pending.start())));

        let run_guard = Arc::clone(&guard);
        let cancel = self.scheduler.schedule(Box::new(move || {
            // Held until the action returns or unwinds.
            let _settle = run_guard.lock().take();
            action();
        }));

        CancelAction::new(move || {
            cancel.cancel();
            let settled = guard.lock().take();
            drop(settled);
        })
    }
}

fn address(scheduler: &Arc<dyn Scheduler>) -> usize {
    Arc::as_ptr(scheduler) as *const () as usize
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `scheduler` so its traffic is counted by this tracker.
    ///
    /// While a wrapper is alive, wrapping the same scheduler again returns
    /// that wrapper. The tracker itself does not keep wrappers or schedulers
    /// alive.
    pub fn wrap(&self, scheduler: &Arc<dyn Scheduler>) -> Arc<dyn Scheduler> {
        let wrapped = &self.inner.wrapped;
        wrapped.retain(|_, tracked| tracked.strong_count() > 0);

        let mut entry = wrapped.entry(address(scheduler)).or_default();
        if let Some(tracked) = entry.upgrade() {
            return tracked;
        }
        let tracked = Arc::new(TrackedScheduler {
            scheduler: Arc::clone(scheduler),
            pending: Arc::clone(&self.inner.pending),
        });
        *entry = Arc::downgrade(&tracked);
        tracked
    }

    /// Whether no action scheduled through a wrapper is outstanding.
    pub fn is_stable(&self) -> bool {
        self.inner.pending.is_zero()
    }

    /// Number of outstanding actions.
    pub fn pending(&self) -> usize {
        self.inner.pending.count.load(Ordering::Acquire)
    }

    /// Resolve once no scheduled work is outstanding.
    ///
    /// Resolves immediately when already stable. When it resolves,
    /// [`is_stable`](Self::is_stable) held at the moment of return.
    pub fn stable(&self) -> impl Future<Output = ()> + Send + 'static {
        let pending = Arc::clone(&self.inner.pending);
        async move {
            loop {
                // Register before checking so a settle in between is not missed.
                let settled = pending.settled.notified();
                if pending.is_zero() {
                    return;
                }
                settled.await;
            }
        }
    }
}

impl fmt::Debug for StabilityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StabilityTracker")
            .field("pending", &self.pending())
            .field("wrapped", &self.inner.wrapped.len())
            .finish()
    }
}
