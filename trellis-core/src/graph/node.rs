//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use smallvec::SmallVec;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback fired when one of a consumer's producers changes.
pub(crate) type Listener = Arc<dyn Fn() + Send + Sync>;

/// Most consumers carry a single listener (a cached value or an effect).
pub(crate) type Listeners = SmallVec<[Listener; 2]>;

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Exposes a polled value and notifies its consumers.
    Producer,

    /// Records the producers it read and carries listeners.
    Consumer,
}

/// A node in the dependency graph.
///
/// Edges are stored on both ends as node ids. A producer only fills
/// `consumers`, a consumer only fills `producers` and `listeners`.
pub(crate) struct Node {
    kind: NodeKind,

    /// Producers read during the latest recording.
    producers: IndexSet<NodeId>,

    /// Consumers whose latest recording read this node.
    consumers: IndexSet<NodeId>,

    listeners: Listeners,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            producers: IndexSet::new(),
            consumers: IndexSet::new(),
            listeners: SmallVec::new(),
        }
    }

    pub fn producer() -> Self {
        Self::new(NodeKind::Producer)
    }

    pub fn consumer() -> Self {
        Self::new(NodeKind::Consumer)
    }

    #[cfg(test)]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn add_producer(&mut self, id: NodeId) -> bool {
        self.producers.insert(id)
    }

    pub fn remove_producer(&mut self, id: NodeId) {
        self.producers.shift_remove(&id);
    }

    pub fn producers(&self) -> &IndexSet<NodeId> {
        &self.producers
    }

    pub fn take_producers(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.producers)
    }

    pub fn add_consumer(&mut self, id: NodeId) -> bool {
        self.consumers.insert(id)
    }

    pub fn remove_consumer(&mut self, id: NodeId) {
        self.consumers.shift_remove(&id);
    }

    pub fn consumers(&self) -> &IndexSet<NodeId> {
        &self.consumers
    }

    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn take_listeners(&mut self) -> Listeners {
        std::mem::take(&mut self.listeners)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("producers", &self.producers)
            .field("consumers", &self.consumers)
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn node_id_displays_with_hash() {
        let id = NodeId::new();
        assert_eq!(id.to_string(), format!("#{}", id.raw()));
    }

    #[test]
    fn edge_sets_ignore_duplicates() {
        let mut node = Node::consumer();
        let dep = NodeId::new();

        assert!(node.add_producer(dep));
        assert!(!node.add_producer(dep));
        assert_eq!(node.producers().len(), 1);

        node.remove_producer(dep);
        assert!(node.producers().is_empty());
    }

    #[test]
    fn take_listeners_leaves_node_empty() {
        let mut node = Node::consumer();
        node.add_listener(Arc::new(|| {}));
        node.add_listener(Arc::new(|| {}));

        assert_eq!(node.take_listeners().len(), 2);
        assert!(node.listeners().is_empty());
        assert_eq!(node.kind(), NodeKind::Consumer);
    }
}
