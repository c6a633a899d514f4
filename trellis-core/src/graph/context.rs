//! Tracking Context
//!
//! The tracking context records which consumer is currently running, so a
//! read can link the producer it touched to that consumer.
//!
//! # Implementation
//!
//! Each thread keeps its own stack of frames. Entering a recording pushes a
//! frame and returns a guard that pops it when dropped, so the stack is
//! restored even when the recorded function panics. Only the innermost frame
//! is consulted on a read.
//!
//! A frame is either a recording consumer or an explicit untracked section.
//! An untracked frame hides every recording beneath it.

use std::cell::RefCell;

use super::NodeId;

thread_local! {
    static TRACKING_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the tracking stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Reads link their producer to this consumer.
    Recording(NodeId),

    /// Reads are allowed but register nothing.
    Untracked,
}

/// What a read should do, as decided by the innermost frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// A consumer is recording; the read becomes a dependency of it.
    Recording(NodeId),

    /// The read happens inside [`untracked`].
    Untracked,

    /// No frame at all.
    Unobserved,
}

/// Guard that pops its frame when dropped.
pub struct TrackingContext {
    frame: Frame,
}

impl TrackingContext {
    /// Push `frame` onto this thread's stack until the guard is dropped.
    pub fn enter(frame: Frame) -> Self {
        TRACKING_STACK.with(|stack| stack.borrow_mut().push(frame));
        Self { frame }
    }

    /// Check if any frame is active on this thread.
    pub fn is_active() -> bool {
        TRACKING_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Number of frames on this thread's stack.
    pub fn depth() -> usize {
        TRACKING_STACK.with(|stack| stack.borrow().len())
    }

    /// Classify a read happening right now.
    pub fn current() -> Tracking {
        TRACKING_STACK.with(|stack| match stack.borrow().last() {
            Some(Frame::Recording(consumer)) => Tracking::Recording(*consumer),
            Some(Frame::Untracked) => Tracking::Untracked,
            None => Tracking::Unobserved,
        })
    }
}

impl Drop for TrackingContext {
    fn drop(&mut self) {
        TRACKING_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame, self.frame,
                    "TrackingContext mismatch: expected {:?}, got {:?}",
                    self.frame, frame
                );
            }
        });
    }
}

/// Run `f` with `consumer` as the innermost recording.
pub fn observe<R>(consumer: NodeId, f: impl FnOnce() -> R) -> R {
    let _ctx = TrackingContext::enter(Frame::Recording(consumer));
    f()
}

/// Run `f` without tracking any read it performs.
///
/// Signal reads inside `f` succeed even when no consumer is recording, and
/// never become dependencies of an enclosing recording.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = TrackingContext::enter(Frame::Untracked);
    f()
}
