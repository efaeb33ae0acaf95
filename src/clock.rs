//! Time source for the session

use std::time::{Duration, Instant};

/// Monotonic time and blocking sleep.
///
/// The session reads time for its poll timer and sleeps between recovery
/// attempts; tests substitute a manual clock to make both instantaneous.
pub trait Clock: Send {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall-clock time via `std`.
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
