// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for schedulable time.
//!
//! Scheduling, eviction and queue-age logic never read the system clock
//! directly; they go through [`Clock`] so tests can drive time with
//! [`FakeClock::advance`]. `now()` is monotonic (timeouts, eviction),
//! `epoch_ms()` is wall time (session age, heartbeat envelopes).

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, for durations and deadlines.
    fn now(&self) -> Instant;

    /// Milliseconds since the Unix epoch, for wire timestamps.
    fn epoch_ms(&self) -> u64;
}

/// Real system time.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually-advanced clock for tests.
///
/// Both `now()` and `epoch_ms()` move together when [`advance`] is called,
/// so age-based and deadline-based logic stay consistent in a test.
///
/// [`advance`]: FakeClock::advance
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeInner>>,
}

struct FakeInner {
    start: Instant,
    base_ms: u64,
    offset: Duration,
}

/// Arbitrary but stable wall-clock origin for fake time.
const FAKE_EPOCH_BASE_MS: u64 = 1_700_000_000_000;

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeInner {
                start: Instant::now(),
                base_ms: FAKE_EPOCH_BASE_MS,
                offset: Duration::ZERO,
            })),
        }
    }

    /// Move time forward by `d`.
    pub fn advance(&self, d: Duration) {
        let mut inner = self.inner.lock();
        inner.offset += d;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let inner = self.inner.lock();
        inner.start + inner.offset
    }

    fn epoch_ms(&self) -> u64 {
        let inner = self.inner.lock();
        inner.base_ms + inner.offset.as_millis() as u64
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
