//! Time source for the pacing loop
//!
//! The engine never calls `Instant::now()` or `thread::sleep` directly so that
//! pacing and pause accounting can be driven deterministically.

use std::time::{Duration, Instant};

/// Monotonic clock with blocking sleeps
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Sleep for a fixed span
    fn sleep(&self, duration: Duration);

    /// Sleep until `deadline`; returns immediately if it has passed
    fn sleep_until(&self, deadline: Instant) {
        let now = self.now();
        if deadline > now {
            self.sleep(deadline - now);
        }
    }
}

/// Wall clock backed by `Instant` and `thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
