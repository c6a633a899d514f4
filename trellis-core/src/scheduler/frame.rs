//! Frame-deferred scheduling.

use std::fmt;
use std::sync::Arc;

use super::batch::Batch;
use super::host::{FrameHost, TokioHost};
use super::{cancellable, Action, CancelAction, Scheduler};

/// Runs each action once, at the host's next frame.
///
/// Actions scheduled before a frame fires run at that frame, one after the
/// other in schedule order. Actions scheduled while a frame is running wait
/// for the following frame.
pub struct FrameScheduler<H = TokioHost> {
    inner: Arc<FrameInner<H>>,
}

struct FrameInner<H> {
    host: H,
    batch: Batch,
}

impl<H: FrameHost + 'static> FrameInner<H> {
    fn request_frame(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.host.request_frame(Box::new(move || {
            if inner.batch.drain() {
                inner.request_frame();
            }
        }));
    }
}

impl<H: FrameHost + 'static> FrameScheduler<H> {
    pub fn new(host: H) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                host,
                batch: Batch::default(),
            }),
        }
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }
}

impl<H: FrameHost + 'static> Scheduler for FrameScheduler<H> {
    fn schedule(&self, action: Action) -> CancelAction {
        let (run, cancel) = cancellable(action, "frame");
        if self.inner.batch.push(run) {
            self.inner.request_frame();
        }
        cancel
    }
}

impl<H> Clone for FrameScheduler<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: fmt::Debug> fmt::Debug for FrameScheduler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("host", &self.inner.host)
            .field("queued", &self.inner.batch.len())
            .finish()
    }
}
