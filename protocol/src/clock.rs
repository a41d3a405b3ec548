//! # Time Source
//!
//! The vault never sleeps or polls. Time only matters as a precondition
//! ("has the withdrawal delay elapsed?") or as an input to a projection
//! ("how much yield since the checkpoint?"), evaluated when a call arrives.
//! Operations read the current time once at call entry through a [`Clock`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// A source of unix timestamps in whole seconds.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> u64;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-1970 clocks clamp to zero rather than wrapping.
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Used by the scenario runner and the test suites to step over withdrawal
/// delays and yield periods deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Jumps to an absolute timestamp.
    pub fn set(&self, timestamp: u64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }

    /// Moves the clock forward by `seconds` and returns the new time.
    pub fn advance(&self, seconds: u64) -> u64 {
        let previous = self.now.fetch_add(seconds, Ordering::SeqCst);
        previous.saturating_add(seconds)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
