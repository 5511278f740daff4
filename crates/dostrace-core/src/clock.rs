//! Elapsed-time clock.
//!
//! Every trace line carries the milliseconds elapsed since the trace
//! [`Epoch`]. The epoch is set at init in eager mode, or when the first
//! program EXEC activates tracing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Real monotonic clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually driven clock for deterministic traces.
///
/// Clones share the same counter, so a test can keep one handle and hand
/// another to the session.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }

    /// Set the absolute reading.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    /// Current reading in milliseconds.
    pub fn millis(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis())
    }
}

/// Zero point of the elapsed-time prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Epoch {
    start: Option<Duration>,
}

impl Epoch {
    /// An epoch that has not been set.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Set the epoch to the clock's current reading.
    pub fn reset(&mut self, clock: &dyn Clock) {
        self.start = Some(clock.now());
    }

    /// Check if the epoch has been set.
    pub fn is_set(&self) -> bool {
        self.start.is_some()
    }

    /// Milliseconds since the epoch, or 0 when unset.
    pub fn elapsed_ms(&self, clock: &dyn Clock) -> u64 {
        match self.start {
            Some(start) => {
                let elapsed = clock.now().saturating_sub(start);
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            }
            None => 0,
        }
    }
}
