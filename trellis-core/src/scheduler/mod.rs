//! Schedulers
//!
//! A [`Scheduler`] decides *when* a pending action runs. The reactive core
//! never runs an effect itself; it hands the run to a scheduler and keeps the
//! returned [`CancelAction`].
//!
//! # Contract
//!
//! Every implementation guarantees:
//!
//! - `cancel()` is idempotent. Calling it zero, one or many times, before or
//!   after the action ran, is observably the same as calling it once.
//! - Two `schedule` calls are two independent timers; they are never merged
//!   into one invocation.
//! - Actions that are not canceled run in the order they were scheduled.
//! - A panicking action leaves the scheduler fully usable.
//!
//! # Strategies
//!
//! - [`TaskScheduler`] runs the action once the current synchronous work
//!   finishes, through a [`DeferHost`].
//! - [`FrameScheduler`] runs the action at the next frame of a [`FrameHost`].
//! - [`ManualScheduler`] queues actions until [`ManualScheduler::flush`].
//!
//! [`StabilityTracker`] wraps any of them to observe outstanding work.

mod batch;
mod frame;
mod host;
mod manual;
mod stability;
mod task;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

pub use frame::FrameScheduler;
pub use host::{DeferHost, FrameConfig, FrameHost, TokioHost};
pub use manual::ManualScheduler;
pub use stability::StabilityTracker;
pub use task::TaskScheduler;

use crate::error::panic_message;

/// A zero-argument unit of scheduled work.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// A pluggable timing policy for pending actions.
pub trait Scheduler: Send + Sync {
    /// Arrange for `action` to run later and return a handle that prevents
    /// it from running.
    fn schedule(&self, action: Action) -> CancelAction;
}

/// Idempotent cancellation handle returned by [`Scheduler::schedule`].
///
/// Clones share the same underlying cancellation: the first `cancel()` on
/// any clone runs it, later calls do nothing.
#[derive(Clone)]
#[must_use = "dropping a CancelAction leaves the action scheduled"]
pub struct CancelAction {
    cancel: Arc<Mutex<Option<Action>>>,
}

impl CancelAction {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Arc::new(Mutex::new(Some(Box::new(cancel)))),
        }
    }

    /// A handle with nothing to cancel.
    pub fn noop() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    pub fn cancel(&self) {
        let cancel = self.cancel.lock().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether `cancel()` has already been called (or there was never
    /// anything to cancel).
    pub fn is_spent(&self) -> bool {
        self.cancel.lock().is_none()
    }
}

impl fmt::Debug for CancelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelAction")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Split `action` into the closure a host runs and the handle that cancels
/// it. Whichever of the two happens first wins; the other becomes a no-op.
pub(crate) fn cancellable(action: Action, strategy: &'static str) -> (Action, CancelAction) {
    let slot = Arc::new(Mutex::new(Some(action)));
    let run_slot = Arc::clone(&slot);

    let run: Action = Box::new(move || {
        let action = run_slot.lock().take();
        if let Some(action) = action {
            run_logged(action, strategy);
        }
    });
    let cancel = CancelAction::new(move || {
        let action = slot.lock().take();
        drop(action);
    });

    (run, cancel)
}

/// Run `action`, logging a panic instead of letting it unwind into the host.
pub(crate) fn run_logged(action: Action, strategy: &'static str) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(action)) {
        tracing::error!(
            strategy,
            panic = %panic_message(payload.as_ref()),
            "scheduled action panicked"
        );
    }
}
