//! Host timing primitives.
//!
//! Concrete schedulers rely on exactly one primitive supplied by the host:
//! "run this once the current synchronous work finishes" ([`DeferHost`]) or
//! "run this before the next frame" ([`FrameHost`]). [`TokioHost`] provides
//! both on top of a tokio runtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::time::Instant;

use super::Action;
use crate::error::ReactiveError;

/// Runs a task once the current synchronous work has finished.
pub trait DeferHost: Send + Sync {
    fn defer(&self, task: Action);
}

/// Runs a task at the next frame boundary.
pub trait FrameHost: Send + Sync {
    fn request_frame(&self, task: Action);
}

/// Frame cadence used by [`TokioHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub frames_per_second: u32,
}

impl FrameConfig {
    /// Duration of one frame.
    pub fn interval(&self) -> Result<Duration, ReactiveError> {
        if self.frames_per_second == 0 {
            return Err(ReactiveError::InvalidFrameRate);
        }
        Ok(Duration::from_secs(1) / self.frames_per_second)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 60,
        }
    }
}

/// Host primitives backed by a tokio runtime.
///
/// Deferred tasks are spawned onto the runtime, which runs them after the
/// spawning code yields. Frame tasks sleep until the next multiple of the
/// frame interval, measured from the moment the host was created, so every
/// request issued within one frame lands on the same boundary.
#[derive(Debug, Clone)]
pub struct TokioHost {
    handle: Handle,
    epoch: Instant,
    frame: Duration,
}

impl TokioHost {
    pub fn new(handle: Handle, config: FrameConfig) -> Result<Self, ReactiveError> {
        Ok(Self {
            handle,
            epoch: Instant::now(),
            frame: config.interval()?,
        })
    }

    /// Use the runtime the caller is running on, with the default frame rate.
    pub fn current() -> Result<Self, ReactiveError> {
        let handle = Handle::try_current().map_err(|_| ReactiveError::NoRuntime)?;
        Self::new(handle, FrameConfig::default())
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame
    }

    /// The first frame boundary strictly after `now`.
    fn next_frame(&self, now: Instant) -> Instant {
        let elapsed = now.saturating_duration_since(self.epoch).as_nanos();
        let frame = self.frame.as_nanos().max(1);
        let frames = elapsed / frame + 1;
        let offset = u64::try_from(frames * frame).unwrap_or(u64::MAX);
        self.epoch + Duration::from_nanos(offset)
    }
}

impl DeferHost for TokioHost {
    fn defer(&self, task: Action) {
        self.handle.spawn(async move {
            task();
        });
    }
}

impl FrameHost for TokioHost {
    fn request_frame(&self, task: Action) {
        let deadline = self.next_frame(Instant::now());
        self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            task();
        });
    }
}
