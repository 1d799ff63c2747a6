//! Monotonic time source
//!
//! TxState access times are monotonic nanoseconds. All components read the
//! clock through [`TimeService`] so tests can move time deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic nanoseconds
pub trait TimeService: Send + Sync {
    /// Current monotonic time in nanoseconds
    fn time(&self) -> u64;
}

/// Process clock backed by [`Instant`]
#[derive(Debug)]
pub struct SystemTimeService {
    origin: Instant,
}

impl SystemTimeService {
    /// Create a clock whose zero is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeService for SystemTimeService {
    fn time(&self) -> u64 {
        // u64 nanoseconds covers ~584 years of uptime
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Manually driven clock for tests
#[derive(Debug, Default)]
pub struct ControlledTimeService {
    now: AtomicU64,
}

impl ControlledTimeService {
    /// Create a clock starting at `start` nanoseconds
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Set the clock to an absolute value
    pub fn set(&self, nanos: u64) {
        self.now.store(nanos, Ordering::SeqCst);
    }
}

impl TimeService for ControlledTimeService {
    fn time(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
