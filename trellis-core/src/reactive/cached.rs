//! Cached Implementation
//!
//! A Cached value is a derived value that recomputes only when one of its
//! dependencies changed since the last computation.
//!
//! # How Cached Values Work
//!
//! 1. Nothing runs on creation. The first read computes the value while
//!    recording which producers the computation touched.
//!
//! 2. Later reads return the stored value without calling the computation.
//!
//! 3. When a dependency notifies, the value is marked dirty and its own
//!    consumers are told it *may* have changed. Nothing recomputes yet.
//!
//! 4. The next read recomputes and records the dependencies again.
//!
//! Invalidation travels eagerly, computation happens lazily: values that are
//! never read again never recompute.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::graph::{bind_producer, notify_consumers, Consumer, NodeId, Producer};

struct CachedState<V> {
    value: Option<V>,
    dirty: bool,
    /// Bumped on every invalidation, so a recompute that raced with a
    /// notification leaves the value dirty.
    generation: u64,
}

/// A memoized derived value.
///
/// Cloning shares the cache.
pub struct Cached<V> {
    producer: Producer<V>,
    state: Arc<Mutex<CachedState<V>>>,
}

/// Create a cached value computed by `compute`.
pub fn cached<V, F>(compute: F) -> Cached<V>
where
    V: Clone + Send + 'static,
    F: Fn() -> V + Send + Sync + 'static,
{
    Cached::new(compute)
}

impl<V> Cached<V>
where
    V: Clone + Send + 'static,
{
    /// Create a new cached value. The computation does not run until the
    /// first [`get`](Self::get).
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        let state = Arc::new(Mutex::new(CachedState {
            value: None,
            dirty: true,
            generation: 0,
        }));
        let consumer = Arc::new(Consumer::new());

        let poll_state = Arc::clone(&state);
        let poll_consumer = Arc::clone(&consumer);
        let producer = Producer::new(move || poll(&poll_state, &poll_consumer, &compute));

        let listener_state = Arc::downgrade(&state);
        let producer_id = producer.id();
        consumer.add_listener(move || {
            if let Some(state) = listener_state.upgrade() {
                let mut state = state.lock();
                state.dirty = true;
                state.generation += 1;
            }
            notify_consumers(producer_id);
        });

        Self { producer, state }
    }

    /// Get the current value, recomputing if a dependency changed.
    ///
    /// Inside a recording this also makes the recording consumer depend on
    /// this cached value.
    pub fn get(&self) -> V {
        bind_producer(&self.producer);
        self.producer.poll()
    }

    pub fn id(&self) -> NodeId {
        self.producer.id()
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Check if a value has been computed at least once.
    pub fn has_value(&self) -> bool {
        self.state.lock().value.is_some()
    }

    /// Number of consumers whose latest recording read this value.
    pub fn consumer_count(&self) -> usize {
        self.producer.consumer_count()
    }
}

fn poll<V, F>(state: &Mutex<CachedState<V>>, consumer: &Consumer, compute: &F) -> V
where
    V: Clone,
    F: Fn() -> V,
{
    let generation = {
        let state = state.lock();
        if !state.dirty {
            if let Some(value) = &state.value {
                return value.clone();
            }
        }
        state.generation
    };

    // Computed without holding the lock: the computation may read other
    // cached values or invalidate this one.
    let value = consumer.record(compute);

    let mut state = state.lock();
    state.value = Some(value.clone());
    if state.generation == generation {
        state.dirty = false;
    }
    value
}

impl<V> Clone for Cached<V> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> Debug for Cached<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Cached")
            .field("id", &self.producer.id())
            .field("dirty", &state.dirty)
            .field("has_value", &state.value.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counted<V: Clone + Send + 'static>(
        f: impl Fn() -> V + Send + Sync + 'static,
    ) -> (Cached<V>, Arc<AtomicI32>) {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let cached = cached(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            f()
        });
        (cached, calls)
    }

    #[test]
    fn computes_on_first_access_only() {
        let (value, calls) = counted(|| 42);

        assert!(!value.has_value());
        assert!(value.is_dirty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(value.get(), 42);
        assert_eq!(value.get(), 42);
        assert_eq!(value.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!value.is_dirty());
    }

    #[test]
    fn dependency_change_marks_dirty_without_recomputing() {
        let source = Signal::new(2);
        let source_clone = source.clone();
        let (doubled, calls) = counted(move || source_clone.get() * 2);

        assert_eq!(doubled.get(), 4);
        source.write(5);

        assert!(doubled.is_dirty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(doubled.get(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cached_chains_propagate_invalidation() {
        let base = Signal::new(5);
        let base_clone = base.clone();
        let doubled = cached(move || base_clone.get() * 2);
        let doubled_clone = doubled.clone();
        let (plus_ten, calls) = counted(move || doubled_clone.get() + 10);

        assert_eq!(plus_ten.get(), 20);

        base.write(10);
        assert!(doubled.is_dirty());
        assert!(plus_ten.is_dirty());

        assert_eq!(plus_ten.get(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn conditional_dependencies_follow_latest_run() {
        let flag = Signal::new(true);
        let a = Signal::new(1);
        let b = Signal::new(2);

        let (flag_c, a_c, b_c) = (flag.clone(), a.clone(), b.clone());
        let (pick, calls) = counted(move || if flag_c.get() { a_c.get() } else { b_c.get() });

        assert_eq!(pick.get(), 1);
        assert_eq!(b.consumer_count(), 0);

        flag.write(false);
        assert_eq!(pick.get(), 2);
        assert_eq!(a.consumer_count(), 0);
        assert_eq!(b.consumer_count(), 1);

        // The untaken branch no longer invalidates.
        a.write(100);
        assert!(!pick.is_dirty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidation_during_compute_keeps_value_dirty() {
        let source = Signal::new(1);
        let source_clone = source.clone();
        let value = cached(move || {
            let value = source_clone.get();
            if value == 1 {
                // Writing a dependency mid-computation invalidates this run.
                source_clone.write(2);
            }
            value
        });

        assert_eq!(value.get(), 1);
        assert!(value.is_dirty());
        assert_eq!(value.get(), 2);
        assert!(!value.is_dirty());
    }

    #[test]
    fn clone_shares_cache() {
        let (first, calls) = counted(|| 7);
        let second = first.clone();

        assert_eq!(first.get(), 7);
        assert!(second.has_value());
        assert_eq!(second.get(), 7);
        assert_eq!(first.id(), second.id());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
