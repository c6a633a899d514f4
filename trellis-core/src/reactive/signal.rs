//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while a consumer is recording, the read links
//!    the signal's producer to that consumer.
//!
//! 2. When a signal is written, every consumer linked to it is notified.
//!
//! 3. Reading a signal outside of any recording is a usage error: the
//!    caller would silently miss updates. [`Signal::read_untracked`] and
//!    [`untracked`](crate::graph::untracked) opt out explicitly.
//!
//! Writes never compare the new value with the old one. Every write
//! notifies, even when the value is unchanged.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ReactiveError;
use crate::graph::{bind_producer, NodeId, Producer, Tracking};

/// A reactive cell holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use trellis_core::graph::Consumer;
/// use trellis_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// let consumer = Consumer::new();
///
/// // Tracked read: the consumer now depends on `count`.
/// assert_eq!(consumer.record(|| count.read()), Ok(0));
///
/// // Outside a recording the read is rejected.
/// assert!(count.read().is_err());
/// assert_eq!(count.read_untracked(), 0);
/// ```
pub struct Signal<T> {
    value: Arc<Mutex<T>>,
    producer: Producer<T>,
}

impl<T> Signal<T>
where
    T: Clone + Send + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        let value = Arc::new(Mutex::new(value));
        let poll_value = Arc::clone(&value);
        Self {
            value,
            producer: Producer::new(move || poll_value.lock().clone()),
        }
    }

    /// Get the signal's node id.
    pub fn id(&self) -> NodeId {
        self.producer.id()
    }

    /// Read the value and register it as a dependency of the recording
    /// consumer.
    ///
    /// Fails with [`ReactiveError::UntrackedRead`] when no consumer is
    /// recording and the read is not wrapped in `untracked`.
    pub fn read(&self) -> Result<T, ReactiveError> {
        match bind_producer(&self.producer) {
            Tracking::Recording(_) | Tracking::Untracked => Ok(self.producer.poll()),
            Tracking::Unobserved => Err(ReactiveError::UntrackedRead { signal: self.id() }),
        }
    }

    /// Like [`read`](Self::read), panicking on an untracked read.
    ///
    /// Convenient inside cached computations and effects, where a recording
    /// is always active.
    pub fn get(&self) -> T {
        match self.read() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Read the value without registering a dependency.
    pub fn read_untracked(&self) -> T {
        self.producer.poll()
    }

    /// Replace the value and notify every consumer that read it.
    pub fn write(&self, value: T) {
        *self.value.lock() = value;
        self.producer.notify_consumers();
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.value.lock().clone();
        self.write(f(&current));
    }

    /// Number of consumers whose latest recording read this signal.
    pub fn consumer_count(&self) -> usize {
        self.producer.consumer_count()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            producer: self.producer.clone(),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &self.read_untracked())
            .field("consumer_count", &self.consumer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
