//! Time and cancellation seams
//!
//! Waiting goes through [`Clock`] so tests can simulate time, and stopping
//! goes through [`CancelToken`], which the binary flips from its Ctrl+C
//! handler.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Granularity at which a [`pause`] notices cancellation
pub const CANCEL_POLL_SLICE: Duration = Duration::from_millis(100);

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Sleep for `duration` in slices, returning early once `cancel` is set.
pub fn pause<C: Clock + ?Sized>(clock: &C, duration: Duration, cancel: &CancelToken) {
    let mut remaining = duration;
    while !remaining.is_zero() && !cancel.is_cancelled() {
        let step = remaining.min(CANCEL_POLL_SLICE);
        clock.sleep(step);
        remaining -= step;
    }
}
