//! Dependency Graph
//!
//! This module implements the producer/consumer graph that tracks which
//! computation read which value and propagates invalidation.
//!
//! # Overview
//!
//! - A [`Producer`] exposes a polled value and remembers the consumers that
//!   read it.
//! - A [`Consumer`] remembers the producers read during its latest
//!   recording and carries listeners fired when any of them changes.
//!
//! Reads are linked through the tracking context: while a consumer records,
//! [`bind_producer`] adds the edge between the producer being read and that
//! consumer.
//!
//! # Design Decisions
//!
//! 1. Nodes live in one arena keyed by [`NodeId`]. Edges are id pairs kept on
//!    both ends, so the graph never owns the handles and cannot form
//!    reference cycles through them.
//!
//! 2. Recording always detaches before it re-attaches. A consumer therefore
//!    depends on what it read last time, never on the union of every run,
//!    which makes conditional reads drop the branch that was not taken.
//!
//! 3. Notification iterates over snapshots. Listeners may subscribe,
//!    unsubscribe or record again while a notification pass is running.

mod arena;
mod consumer;
mod context;
mod node;
mod producer;

pub use consumer::Consumer;
pub use context::{observe, untracked, Frame, Tracking, TrackingContext};
pub use node::{NodeId, NodeKind};
pub use producer::{bind_producer, Producer};
pub(crate) use producer::notify_consumers;
