//! Error types for the reactive core.

use std::any::Any;

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by misuse of the reactive primitives or their hosts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A signal was read outside of any recording.
    ///
    /// Wrap the read in [`untracked`](crate::graph::untracked) or use
    /// `read_untracked` when no dependency is wanted.
    #[error("signal {signal} was read outside of a recording; use `untracked` to read it without tracking")]
    UntrackedRead { signal: NodeId },

    /// A tokio-backed host was requested outside of a tokio runtime.
    #[error("no tokio runtime is available to drive the scheduler")]
    NoRuntime,

    /// The frame configuration asked for zero frames per second.
    #[error("frame rate must be at least one frame per second")]
    InvalidFrameRate,
}

/// A scheduled action that panicked while a [`ManualScheduler`] was flushing.
///
/// [`ManualScheduler`]: crate::scheduler::ManualScheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPanic {
    /// Position of the action in the flushed batch.
    pub index: usize,
    /// The panic message, when the payload was a string.
    pub message: String,
}

/// Every panic raised during one flush, reported together once the queue
/// has drained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of {executed} scheduled action(s) panicked during flush: {}", .failures.len(), summary(.failures))]
pub struct FlushError {
    /// Number of actions that ran, including the failed ones.
    pub executed: usize,
    pub failures: Vec<ActionPanic>,
}

fn summary(failures: &[ActionPanic]) -> String {
    failures
        .iter()
        .map(|failure| format!("#{}: {}", failure.index, failure.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
