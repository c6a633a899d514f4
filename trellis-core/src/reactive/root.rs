//! Reactive Root
//!
//! A root ties effects to an external notion of "active". Each time the host
//! reports activation, every effect registered on the root is created from
//! scratch; each deactivation disposes them. While inactive a root holds no
//! graph edges and no scheduled work, so everything it read can be freed.
//!
//! # Lifecycle
//!
//! The host supplies a [`LifecycleNotifier`]. [`LifecycleSwitch`] is an
//! in-memory notifier for hosts without their own lifecycle and for tests.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::effect::{effect, EffectOutcome};
use crate::scheduler::{Scheduler, StabilityTracker};

/// Undoes one activation.
pub type Deactivate = Box<dyn FnOnce() + Send>;

/// Called on each activation; returns how to undo it.
pub type Activate = Box<dyn FnMut() -> Deactivate + Send>;

/// External source of activation and deactivation events.
pub trait LifecycleNotifier: Send + Sync {
    /// Register `activate`. If the host is active it must be invoked right
    /// away. On deactivation the host invokes the most recently returned
    /// [`Deactivate`].
    fn on_activate(&self, activate: Activate);
}

struct Registration {
    /// Taken out while it runs.
    activate: Option<Activate>,
    deactivate: Option<Deactivate>,
}

/// A lifecycle notifier toggled by hand.
#[derive(Clone, Default)]
pub struct LifecycleSwitch {
    inner: Arc<Mutex<SwitchState>>,
}

#[derive(Default)]
struct SwitchState {
    active: bool,
    registrations: Vec<Arc<Mutex<Registration>>>,
}

impl LifecycleSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    /// Invoke every registered activate callback. No-op when already active.
    pub fn activate(&self) {
        let registrations = {
            let mut state = self.inner.lock();
            if state.active {
                return;
            }
            state.active = true;
            state.registrations.clone()
        };
        tracing::debug!(registrations = registrations.len(), "activating");
        for registration in registrations {
            self.run_activation(&registration);
        }
    }

    /// Invoke the pending deactivate callback of every registration. No-op
    /// when already inactive.
    pub fn deactivate(&self) {
        let registrations = {
            let mut state = self.inner.lock();
            if !state.active {
                return;
            }
            state.active = false;
            state.registrations.clone()
        };
        tracing::debug!(registrations = registrations.len(), "deactivating");
        for registration in registrations {
            let deactivate = registration.lock().deactivate.take();
            if let Some(deactivate) = deactivate {
                deactivate();
            }
        }
    }

    /// Invoke one activate callback without holding any lock, then keep its
    /// deactivate callback. If the switch was turned off meanwhile, the
    /// activation is undone right away.
    fn run_activation(&self, registration: &Mutex<Registration>) {
        let Some(mut activate) = registration.lock().activate.take() else {
            return;
        };
        let deactivate = activate();

        let still_active = self.is_active();
        let stale = {
            let mut registration = registration.lock();
            registration.activate = Some(activate);
            if still_active {
                registration.deactivate.replace(deactivate)
            } else {
                Some(deactivate)
            }
        };
        if let Some(stale) = stale {
            stale();
        }
    }
}

impl LifecycleNotifier for LifecycleSwitch {
    fn on_activate(&self, activate: Activate) {
        let registration = Arc::new(Mutex::new(Registration {
            activate: Some(activate),
            deactivate: None,
        }));
        let active = {
            let mut state = self.inner.lock();
            state.registrations.push(Arc::clone(&registration));
            state.active
        };
        if active {
            self.run_activation(&registration);
        }
    }
}

impl fmt::Debug for LifecycleSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("LifecycleSwitch")
            .field("active", &state.active)
            .field("registrations", &state.registrations.len())
            .finish()
    }
}

/// Effects bound to an external lifecycle, with quiescence tracking.
pub struct ReactiveRoot {
    lifecycle: Arc<dyn LifecycleNotifier>,
    tracker: StabilityTracker,
    scheduler: Arc<dyn Scheduler>,
}

impl ReactiveRoot {
    /// Create a root whose effects run on `scheduler` unless told otherwise.
    pub fn new(lifecycle: Arc<dyn LifecycleNotifier>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            lifecycle,
            tracker: StabilityTracker::new(),
            scheduler,
        }
    }

    /// Register an effect that exists only while the root is active.
    ///
    /// Every activation creates a fresh effect running `callback` on the
    /// tracker-wrapped `scheduler` (the root's default when `None`); every
    /// deactivation disposes it.
    pub fn effect<F, R>(&self, callback: F, scheduler: Option<Arc<dyn Scheduler>>)
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: EffectOutcome,
    {
        let scheduler = scheduler.unwrap_or_else(|| Arc::clone(&self.scheduler));
        let wrapped = self.tracker.wrap(&scheduler);
        let callback = Arc::new(callback);

        self.lifecycle.on_activate(Box::new(move || -> Deactivate {
            let callback = Arc::clone(&callback);
            let handle = effect(move || (*callback)(), Arc::clone(&wrapped));
            Box::new(move || handle.dispose())
        }));
    }

    pub fn tracker(&self) -> &StabilityTracker {
        &self.tracker
    }

    pub fn is_stable(&self) -> bool {
        self.tracker.is_stable()
    }

    /// Wait until no effect of this root has work outstanding.
    pub async fn stable(&self) {
        self.tracker.stable().await;
    }
}

impl fmt::Debug for ReactiveRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveRoot")
            .field("tracker", &self.tracker)
            .finish()
    }
}
