//! Trellis Core
//!
//! A fine-grained reactive runtime. It implements:
//!
//! - Dependency tracking between producers and consumers
//! - Signals, lazily cached derived values, and scheduled effects
//! - Pluggable schedulers (task, frame, and manual) plus quiescence tracking
//! - Roots that tie effects to an external activation lifecycle
//!
//! # Architecture
//!
//! - `graph`: producer/consumer nodes and the per-thread tracking context
//! - `reactive`: signals, cached values, effects, and roots
//! - `scheduler`: the `Scheduler` trait, its strategies, and stability
//! - `error`: error types shared by the crate
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//!
//! use trellis_core::reactive::{cached, effect, Signal};
//! use trellis_core::scheduler::ManualScheduler;
//!
//! let count = Signal::new(1);
//! let count_clone = count.clone();
//! let doubled = cached(move || count_clone.get() * 2);
//!
//! let seen = Arc::new(AtomicI32::new(0));
//! let seen_clone = seen.clone();
//! let scheduler = Arc::new(ManualScheduler::new());
//! let _handle = effect(
//!     move || seen_clone.store(doubled.get(), Ordering::SeqCst),
//!     scheduler.clone(),
//! );
//!
//! scheduler.flush().unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 2);
//!
//! count.write(5);
//! scheduler.flush().unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 10);
//! ```

pub mod error;
pub mod graph;
pub mod reactive;
pub mod scheduler;

pub use error::{ActionPanic, FlushError, ReactiveError};
pub use graph::{untracked, Consumer, NodeId, Producer};
pub use reactive::{cached, effect, Cached, EffectHandle, ReactiveRoot, Signal};
pub use scheduler::{CancelAction, ManualScheduler, Scheduler, StabilityTracker};
