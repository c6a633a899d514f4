//! Task-deferred scheduling.

use std::fmt;
use std::sync::Arc;

use super::batch::Batch;
use super::host::{DeferHost, TokioHost};
use super::{cancellable, Action, CancelAction, Scheduler};

/// Runs each action once the current synchronous work has unwound, using
/// the host's deferral primitive.
///
/// Actions share one deferred drain, so they run in schedule order whatever
/// order the host runs its own tasks in.
pub struct TaskScheduler<H = TokioHost> {
    inner: Arc<TaskInner<H>>,
}

struct TaskInner<H> {
    host: H,
    batch: Batch,
}

impl<H: DeferHost + 'static> TaskInner<H> {
    fn request_drain(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.host.defer(Box::new(move || {
            if inner.batch.drain() {
                inner.request_drain();
            }
        }));
    }
}

impl<H: DeferHost + 'static> TaskScheduler<H> {
    pub fn new(host: H) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                host,
                batch: Batch::default(),
            }),
        }
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }
}

impl<H: DeferHost + 'static> Scheduler for TaskScheduler<H> {
    fn schedule(&self, action: Action) -> CancelAction {
        let (run, cancel) = cancellable(action, "task");
        if self.inner.batch.push(run) {
            self.inner.request_drain();
        }
        cancel
    }
}

impl<H> Clone for TaskScheduler<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: fmt::Debug> fmt::Debug for TaskScheduler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("host", &self.inner.host)
            .field("queued", &self.inner.batch.len())
            .finish()
    }
}
