//! The monotonic microsecond clock the jitter buffer consults for NACK
//! aging. Kept as an injected trait rather than a direct `Instant::now()`
//! call so the RENACK_TIME-dependent NACK tests are deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic microsecond time source.
pub trait Clock: Send + Sync {
    /// Microseconds since some arbitrary, monotonically increasing origin.
    /// Only differences between two calls are meaningful.
    fn now_micros(&self) -> u64;
}

/// The default [`Clock`], backed by [`std::time::Instant`].
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// A test double allowing deterministic control over elapsed time, so that
/// RENACK_TIME-gated assertions don't depend on wall-clock scheduling.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `micros` microseconds.
    pub fn advance(&self, micros: u64) {
        self.micros.fetch_add(micros, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.micros.load(Ordering::Relaxed)
    }
}
