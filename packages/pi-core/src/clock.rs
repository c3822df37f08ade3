//! Abstraction over "now", injected so the engine's timing logic can be
//! driven deterministically in tests.
//!
//! Mirrors the teacher's `ClockSource`/`SystemClock` split (see
//! `topgun_core::hlc`), but returns whole-second UNIX time rather than
//! milliseconds: every timestamp in the session model (`date_created`,
//! `last_active`, `cooldown_expiry`, `tasked_time`) is second-granular.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, seconds since the Unix epoch.
///
/// Implementations must be monotonic non-decreasing in practice (the engine
/// does not defend against a clock going backwards); `SystemClock` relies on
/// the OS wall clock for this.
pub trait Clock: Send + Sync {
    /// Current time, whole seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Default clock backed by `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before Unix epoch")
            .as_secs() as i64
    }
}

/// A settable clock for tests, so scenarios like `spec.md` §8's "advance to
/// now₀+61" can be expressed directly instead of sleeping.
#[derive(Debug)]
pub struct VirtualClock {
    now: AtomicI64,
}

impl VirtualClock {
    /// Creates a virtual clock starting at `start`.
    #[must_use]
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Advances the clock by `seconds` and returns the new value.
    pub fn advance(&self, seconds: i64) -> i64 {
        self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
    }

    /// Sets the clock to an absolute value.
    pub fn set(&self, value: i64) {
        self.now.store(value, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances() {
        let clock = VirtualClock::new(1_000_000);
        assert_eq!(clock.now(), 1_000_000);
        assert_eq!(clock.advance(61), 1_000_061);
        assert_eq!(clock.now(), 1_000_061);
    }

    #[test]
    fn virtual_clock_set() {
        let clock = VirtualClock::new(0);
        clock.set(42);
        assert_eq!(clock.now(), 42);
    }
}
