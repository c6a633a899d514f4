//! Node Arena
//!
//! All producer and consumer nodes live in one arena indexed by [`NodeId`].
//! Edges are id pairs stored on both ends, so the graph itself never holds
//! reference-counted pointers to the handles that own the nodes. A handle
//! removes its node when dropped, which detaches every edge touching it.
//!
//! # Locking
//!
//! The arena sits behind a single mutex. Every operation that would run user
//! code (listeners) first copies what it needs out of the arena and releases
//! the lock, so listeners can freely re-enter the graph.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;

use super::node::{Listener, Listeners, Node, NodeId, NodeKind};

static GRAPH: OnceLock<Mutex<Graph>> = OnceLock::new();

fn graph() -> &'static Mutex<Graph> {
    GRAPH.get_or_init(|| Mutex::new(Graph::new()))
}

/// Run `f` with exclusive access to the shared arena.
///
/// `f` must not call back into user code.
pub(crate) fn with_graph<R>(f: impl FnOnce(&mut Graph) -> R) -> R {
    f(&mut graph().lock())
}

/// The arena of graph nodes.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    nodes: HashMap<NodeId, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Insert a fresh node of the given kind.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new();
        let node = match kind {
            NodeKind::Producer => Node::producer(),
            NodeKind::Consumer => Node::consumer(),
        };
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge that touches it.
    ///
    /// The removed node is returned so the caller can drop its listeners
    /// after releasing the arena lock.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;

        for producer in node.producers() {
            if let Some(producer) = self.nodes.get_mut(producer) {
                producer.remove_consumer(id);
            }
        }
        for consumer in node.consumers() {
            if let Some(consumer) = self.nodes.get_mut(consumer) {
                consumer.remove_producer(id);
            }
        }

        Some(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Add the edge `producer -> consumer` on both ends.
    ///
    /// Returns `false` when either node is gone.
    pub fn link(&mut self, producer: NodeId, consumer: NodeId) -> bool {
        if !self.contains(producer) || !self.contains(consumer) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(&consumer) {
            node.add_producer(producer);
        }
        if let Some(node) = self.nodes.get_mut(&producer) {
            node.add_consumer(consumer);
        }
        true
    }

    /// Drop every edge from `consumer` to its producers.
    ///
    /// Returns the number of producers that were detached.
    pub fn detach_producers(&mut self, consumer: NodeId) -> usize {
        let producers = match self.nodes.get_mut(&consumer) {
            Some(node) => node.take_producers(),
            None => return 0,
        };
        for producer in &producers {
            if let Some(node) = self.nodes.get_mut(producer) {
                node.remove_consumer(consumer);
            }
        }
        producers.len()
    }

    /// Snapshot of the consumers currently subscribed to `producer`.
    pub fn consumers_of(&self, producer: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&producer)
            .map(|node| node.consumers().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the listeners registered on `consumer`.
    pub fn listeners_of(&self, consumer: NodeId) -> Listeners {
        self.nodes
            .get(&consumer)
            .map(|node| node.listeners().clone())
            .unwrap_or_default()
    }

    pub fn add_listener(&mut self, consumer: NodeId, listener: Listener) -> bool {
        match self.nodes.get_mut(&consumer) {
            Some(node) => {
                node.add_listener(listener);
                true
            }
            None => false,
        }
    }

    pub fn take_listeners(&mut self, consumer: NodeId) -> Listeners {
        self.nodes
            .get_mut(&consumer)
            .map(Node::take_listeners)
            .unwrap_or_default()
    }

    pub fn producer_count(&self, consumer: NodeId) -> usize {
        self.nodes
            .get(&consumer)
            .map_or(0, |node| node.producers().len())
    }

    pub fn consumer_count(&self, producer: NodeId) -> usize {
        self.nodes
            .get(&producer)
            .map_or(0, |node| node.consumers().len())
    }

    pub fn has_edge(&self, producer: NodeId, consumer: NodeId) -> bool {
        let forward = self
            .nodes
            .get(&producer)
            .is_some_and(|node| node.consumers().contains(&consumer));
        let backward = self
            .nodes
            .get(&consumer)
            .is_some_and(|node| node.producers().contains(&producer));
        debug_assert_eq!(forward, backward, "edge {producer} -> {consumer} is one-sided");
        forward && backward
    }

    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn add_and_remove_nodes() {
        let mut graph = Graph::new();

        let producer = graph.add_node(NodeKind::Producer);
        let consumer = graph.add_node(NodeKind::Consumer);
        assert_eq!(graph.node_count(), 2);

        let removed = graph.remove_node(producer).unwrap();
        assert_eq!(removed.kind(), NodeKind::Producer);
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.contains(producer));
        assert!(graph.contains(consumer));
        assert!(graph.remove_node(producer).is_none());
    }

    #[test]
    fn link_stores_both_directions() {
        let mut graph = Graph::new();
        let producer = graph.add_node(NodeKind::Producer);
        let consumer = graph.add_node(NodeKind::Consumer);

        assert!(graph.link(producer, consumer));
        assert!(graph.has_edge(producer, consumer));
        assert_eq!(graph.consumer_count(producer), 1);
        assert_eq!(graph.producer_count(consumer), 1);

        // Linking twice keeps a single edge.
        assert!(graph.link(producer, consumer));
        assert_eq!(graph.consumers_of(producer), vec![consumer]);
    }

    #[test]
    fn link_to_missing_node_is_rejected() {
        let mut graph = Graph::new();
        let consumer = graph.add_node(NodeKind::Consumer);

        assert!(!graph.link(NodeId::new(), consumer));
        assert_eq!(graph.producer_count(consumer), 0);
    }

    #[test]
    fn detach_producers_clears_reverse_edges() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Producer);
        let b = graph.add_node(NodeKind::Producer);
        let consumer = graph.add_node(NodeKind::Consumer);

        graph.link(a, consumer);
        graph.link(b, consumer);

        assert_eq!(graph.detach_producers(consumer), 2);
        assert_eq!(graph.consumer_count(a), 0);
        assert_eq!(graph.consumer_count(b), 0);
        assert_eq!(graph.producer_count(consumer), 0);
    }

    #[test]
    fn remove_node_detaches_edges() {
        let mut graph = Graph::new();
        let producer = graph.add_node(NodeKind::Producer);
        let consumer = graph.add_node(NodeKind::Consumer);
        graph.link(producer, consumer);

        graph.remove_node(consumer);
        assert_eq!(graph.consumer_count(producer), 0);

        let consumer = graph.add_node(NodeKind::Consumer);
        graph.link(producer, consumer);
        graph.remove_node(producer);
        assert_eq!(graph.producer_count(consumer), 0);
    }

    #[test]
    fn consumers_are_listed_in_subscription_order() {
        let mut graph = Graph::new();
        let producer = graph.add_node(NodeKind::Producer);
        let first = graph.add_node(NodeKind::Consumer);
        let second = graph.add_node(NodeKind::Consumer);

        graph.link(producer, second);
        graph.link(producer, first);

        assert_eq!(graph.consumers_of(producer), vec![second, first]);
    }

    #[test]
    fn listeners_are_snapshotted_and_taken() {
        let mut graph = Graph::new();
        let consumer = graph.add_node(NodeKind::Consumer);

        assert!(graph.add_listener(consumer, Arc::new(|| {})));
        let snapshot = graph.listeners_of(consumer);
        assert_eq!(snapshot.len(), 1);

        assert_eq!(graph.take_listeners(consumer).len(), 1);
        assert!(graph.listeners_of(consumer).is_empty());
        assert!(!graph.add_listener(NodeId::new(), Arc::new(|| {})));
    }
}
