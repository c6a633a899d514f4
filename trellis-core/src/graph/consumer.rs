//! Consumers: graph nodes that record which producers they read.

use std::fmt;
use std::sync::Arc;

use super::arena::with_graph;
use super::context::observe;
use super::node::{NodeId, NodeKind};

/// A graph node that tracks the producers read during its latest recording
/// and fires its listeners whenever one of them changes.
///
/// The consumer owns its node: dropping it removes the node and every edge.
pub struct Consumer {
    id: NodeId,
}

impl Consumer {
    pub fn new() -> Self {
        Self {
            id: with_graph(|graph| graph.add_node(NodeKind::Consumer)),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Run `f` as this consumer's new recording.
    ///
    /// Every edge from the previous recording is dropped first, so after the
    /// call the consumer depends on exactly the producers `f` read.
    pub fn record<R>(&self, f: impl FnOnce() -> R) -> R {
        let detached = with_graph(|graph| graph.detach_producers(self.id));
        tracing::trace!(consumer = %self.id, detached, "recording");
        observe(self.id, f)
    }

    /// Register a callback fired whenever a producer this consumer depends on
    /// notifies.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        with_graph(|graph| graph.add_listener(self.id, Arc::new(listener)));
    }

    /// Invoke every listener registered when the call starts.
    pub fn notify_listeners(&self) {
        notify_listeners(self.id);
    }

    /// Detach from all producers and drop all listeners.
    ///
    /// The consumer stays usable: a later [`record`](Self::record) builds new
    /// edges, but nothing will be notified until a listener is added again.
    pub fn destroy(&self) {
        let listeners = with_graph(|graph| {
            graph.detach_producers(self.id);
            graph.take_listeners(self.id)
        });
        drop(listeners);
    }

    /// Number of producers read during the latest recording.
    pub fn producer_count(&self) -> usize {
        with_graph(|graph| graph.producer_count(self.id))
    }

    pub fn depends_on(&self, producer: NodeId) -> bool {
        with_graph(|graph| graph.has_edge(producer, self.id))
    }
}

impl Default for Consumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        let removed = with_graph(|graph| graph.remove_node(self.id));
        drop(removed);
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("producer_count", &self.producer_count())
            .finish()
    }
}

pub(crate) fn notify_listeners(consumer: NodeId) {
    let listeners = with_graph(|graph| graph.listeners_of(consumer));
    for listener in listeners {
        listener();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{bind_producer, Producer};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counter() -> (Arc<AtomicI32>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        (count, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn record_returns_result_and_tracks_reads() {
        let a = Producer::new(|| 1);
        let b = Producer::new(|| 2);
        let consumer = Consumer::new();

        let sum = consumer.record(|| {
            bind_producer(&a);
            bind_producer(&b);
            a.poll() + b.poll()
        });

        assert_eq!(sum, 3);
        assert!(consumer.depends_on(a.id()));
        assert!(consumer.depends_on(b.id()));
    }

    #[test]
    fn record_replaces_previous_dependencies() {
        let a = Producer::new(|| 1);
        let b = Producer::new(|| 2);
        let consumer = Consumer::new();

        consumer.record(|| {
            bind_producer(&a);
        });
        consumer.record(|| {
            bind_producer(&b);
        });

        assert!(!consumer.depends_on(a.id()));
        assert_eq!(a.consumer_count(), 0);
        assert!(consumer.depends_on(b.id()));
    }

    #[test]
    fn producer_notifies_listeners() {
        let producer = Producer::new(|| ());
        let consumer = Consumer::new();
        let (count, listener) = counter();
        consumer.add_listener(listener);

        consumer.record(|| {
            bind_producer(&producer);
        });
        producer.notify_consumers();
        producer.notify_consumers();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn consumer_subscribed_during_notification_waits_for_next_pass() {
        let producer = Producer::new(|| ());
        let first = Consumer::new();
        let late = Arc::new(Consumer::new());
        let (late_count, late_listener) = counter();
        late.add_listener(late_listener);

        let producer_clone = producer.clone();
        let late_clone = late.clone();
        first.add_listener(move || {
            late_clone.record(|| {
                bind_producer(&producer_clone);
            });
        });
        first.record(|| {
            bind_producer(&producer);
        });

        producer.notify_consumers();
        assert_eq!(late_count.load(Ordering::SeqCst), 0);
        assert!(late.depends_on(producer.id()));

        producer.notify_consumers();
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_detaches_and_silences() {
        let producer = Producer::new(|| ());
        let consumer = Consumer::new();
        let (count, listener) = counter();
        consumer.add_listener(listener);
        consumer.record(|| {
            bind_producer(&producer);
        });

        consumer.destroy();
        assert_eq!(producer.consumer_count(), 0);

        consumer.record(|| {
            bind_producer(&producer);
        });
        producer.notify_consumers();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_recording_keeps_reads_made_before_the_panic() {
        let a = Producer::new(|| ());
        let b = Producer::new(|| ());
        let consumer = Consumer::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            consumer.record(|| {
                bind_producer(&a);
                panic!("boom");
            })
        }));

        assert!(result.is_err());
        assert!(consumer.depends_on(a.id()));
        assert!(!consumer.depends_on(b.id()));

        consumer.record(|| {
            bind_producer(&b);
        });
        assert!(!consumer.depends_on(a.id()));
        assert!(consumer.depends_on(b.id()));
    }
}
