//! Reactive Primitives
//!
//! This module builds the user-facing primitives on top of the dependency
//! graph: signals, cached values, effects, and roots.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a container for mutable state. Reading it while a
//! consumer records registers a dependency; writing it notifies every
//! dependent.
//!
//! ## Cached Values
//!
//! A [`Cached`] value is derived from other reactive values. It recomputes
//! lazily, on the first read after a dependency changed.
//!
//! ## Effects
//!
//! An [`effect`] is a side-effecting computation. Its runs always go through
//! a [`Scheduler`](crate::scheduler::Scheduler), never inline with the write
//! that invalidated it.
//!
//! ## Roots
//!
//! A [`ReactiveRoot`] owns effects for as long as an external lifecycle is
//! active and reports when all of their work has settled.

mod cached;
mod effect;
mod root;
mod signal;

pub use cached::{cached, Cached};
pub use effect::{effect, EffectHandle, EffectOutcome};
pub use root::{Activate, Deactivate, LifecycleNotifier, LifecycleSwitch, ReactiveRoot};
pub use signal::Signal;
