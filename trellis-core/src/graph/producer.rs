//! Producers: graph nodes that expose a polled value.

use std::fmt;
use std::sync::Arc;

use super::arena::with_graph;
use super::consumer::notify_listeners;
use super::context::{Tracking, TrackingContext};
use super::node::{NodeId, NodeKind};

/// A graph node wrapping a `poll` function and the consumers that read it.
///
/// Cloning a producer shares the node. The node is removed from the graph
/// once the last clone is dropped.
pub struct Producer<V> {
    inner: Arc<ProducerInner<V>>,
}

struct ProducerInner<V> {
    id: NodeId,
    poll: Box<dyn Fn() -> V + Send + Sync>,
}

impl<V> Producer<V> {
    /// Create a producer whose value is obtained by calling `poll`.
    pub fn new<F>(poll: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        let id = with_graph(|graph| graph.add_node(NodeKind::Producer));
        Self {
            inner: Arc::new(ProducerInner {
                id,
                poll: Box::new(poll),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Read the current value. This never creates a dependency; pair it with
    /// [`bind_producer`] for tracked reads.
    pub fn poll(&self) -> V {
        (self.inner.poll)()
    }

    /// Tell every subscribed consumer that this producer may have changed.
    pub fn notify_consumers(&self) {
        notify_consumers(self.inner.id);
    }

    /// Number of consumers whose latest recording read this producer.
    pub fn consumer_count(&self) -> usize {
        with_graph(|graph| graph.consumer_count(self.inner.id))
    }

    pub fn has_consumer(&self, consumer: NodeId) -> bool {
        with_graph(|graph| graph.has_edge(self.inner.id, consumer))
    }
}

impl<V> Clone for Producer<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Producer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("id", &self.inner.id)
            .field("consumer_count", &self.consumer_count())
            .finish()
    }
}

impl<V> Drop for ProducerInner<V> {
    fn drop(&mut self) {
        let removed = with_graph(|graph| graph.remove_node(self.id));
        drop(removed);
    }
}

/// Link `producer` to the innermost recording consumer, if any.
///
/// Returns how the read was classified so callers can reject untracked
/// reads.
pub fn bind_producer<V>(producer: &Producer<V>) -> Tracking {
    let tracking = TrackingContext::current();
    if let Tracking::Recording(consumer) = tracking {
        with_graph(|graph| graph.link(producer.id(), consumer));
    }
    tracking
}

/// Notify a snapshot of the consumers subscribed to `producer`.
///
/// Consumers that subscribe while this pass is running are not notified by
/// it.
pub(crate) fn notify_consumers(producer: NodeId) {
    let consumers = with_graph(|graph| graph.consumers_of(producer));
    tracing::trace!(producer = %producer, consumers = consumers.len(), "notifying consumers");
    for consumer in consumers {
        notify_listeners(consumer);
    }
}
