//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs, through a
//! [`Scheduler`], whenever its dependencies change.
//!
//! # How Effects Work
//!
//! 1. Creating an effect schedules its first run. Nothing runs during the
//!    call to [`effect`].
//!
//! 2. Each run records the dependencies the callback reads, replacing those
//!    of the previous run.
//!
//! 3. When any dependency changes, one re-run is scheduled. Further changes
//!    before that run fires are absorbed by it: any number of invalidations
//!    between two runs produce exactly one re-execution.
//!
//! # Failures
//!
//! A callback may return `()` or `Result<(), E>`. Returned errors and panics
//! are caught at the end of the run and logged; the effect keeps its
//! dependencies from the failed run and re-runs normally on the next change.
//!
//! # Disposal
//!
//! The [`EffectHandle`] returned by [`effect`] owns the effect. Disposing it
//! (or dropping it) cancels any pending run and detaches every dependency.

use std::fmt::{self, Display};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::panic_message;
use crate::graph::{Consumer, NodeId};
use crate::scheduler::{CancelAction, Scheduler};

/// What an effect callback returns.
///
/// Implemented for `()` and for `Result<(), E>` with a displayable error, so
/// callbacks can use `?` on fallible reads such as
/// [`Signal::read`](crate::reactive::Signal::read).
pub trait EffectOutcome {
    /// Log the outcome of the run of `effect`.
    fn report(self, effect: NodeId);
}

impl EffectOutcome for () {
    fn report(self, _effect: NodeId) {}
}

impl<E: Display> EffectOutcome for Result<(), E> {
    fn report(self, effect: NodeId) {
        if let Err(error) = self {
            tracing::error!(effect = %effect, error = %error, "effect failed");
        }
    }
}

#[derive(Default)]
struct EffectState {
    /// A run is queued and has not started yet.
    scheduled: bool,
    /// Bumped each time a run is scheduled; identifies which scheduling the
    /// `pending` handle belongs to.
    generation: u64,
    disposed: bool,
    pending: Option<CancelAction>,
    runs: usize,
}

struct EffectInner {
    consumer: Consumer,
    callback: Box<dyn Fn() + Send + Sync>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<EffectState>,
}

impl EffectInner {
    /// Schedule a run unless one is already queued.
    fn invalidate(self: &Arc<Self>) {
        let generation = {
            let mut state = self.state.lock();
            if state.scheduled || state.disposed {
                return;
            }
            state.scheduled = true;
            state.generation += 1;
            state.generation
        };

        let effect = Arc::downgrade(self);
        let cancel = self.scheduler.schedule(Box::new(move || {
            if let Some(effect) = effect.upgrade() {
                effect.run();
            }
        }));
        tracing::trace!(effect = %self.consumer.id(), "effect run scheduled");

        // The scheduler may have run the action already (and a newer run may
        // be pending), or the effect may have been disposed meanwhile.
        let mut state = self.state.lock();
        if state.disposed {
            drop(state);
            cancel.cancel();
        } else if state.scheduled && state.generation == generation {
            state.pending = Some(cancel);
        }
    }

    fn run(&self) {
        {
            let mut state = self.state.lock();
            state.scheduled = false;
            state.pending = None;
            if state.disposed {
                return;
            }
            state.runs += 1;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.consumer.record(|| (self.callback)());
        }));
        if let Err(payload) = outcome {
            tracing::error!(
                effect = %self.consumer.id(),
                panic = %panic_message(payload.as_ref()),
                "effect panicked"
            );
        }

        // Disposed by its own callback: reads made after the dispose linked
        // new edges.
        if self.state.lock().disposed {
            self.consumer.destroy();
        }
    }

    fn dispose(&self) {
        let pending = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.scheduled = false;
            state.pending.take()
        };
        if let Some(cancel) = pending {
            cancel.cancel();
        }
        self.consumer.destroy();
        tracing::debug!(effect = %self.consumer.id(), "effect disposed");
    }
}

/// Create an effect that runs `callback` on `scheduler`, now and whenever a
/// dependency it read changes.
///
/// The first run is scheduled, not executed, before this returns.
pub fn effect<F, R>(callback: F, scheduler: Arc<dyn Scheduler>) -> EffectHandle
where
    F: Fn() -> R + Send + Sync + 'static,
    R: EffectOutcome,
{
    let consumer = Consumer::new();
    let id = consumer.id();

    let inner = Arc::new(EffectInner {
        consumer,
        callback: Box::new(move || callback().report(id)),
        scheduler,
        state: Mutex::new(EffectState::default()),
    });

    let listener: Weak<EffectInner> = Arc::downgrade(&inner);
    inner.consumer.add_listener(move || {
        if let Some(effect) = listener.upgrade() {
            effect.invalidate();
        }
    });

    tracing::debug!(effect = %id, "effect created");
    inner.invalidate();
    EffectHandle { inner }
}

/// Owner of an effect; disposes it when dropped.
#[must_use = "dropping an EffectHandle disposes the effect"]
pub struct EffectHandle {
    inner: Arc<EffectInner>,
}

impl EffectHandle {
    pub fn id(&self) -> NodeId {
        self.inner.consumer.id()
    }

    /// Cancel any pending run and detach every dependency. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.state.lock().runs
    }

    /// Number of dependencies read during the latest run.
    pub fn dependency_count(&self) -> usize {
        self.inner.consumer.producer_count()
    }
}

impl Drop for EffectHandle {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
