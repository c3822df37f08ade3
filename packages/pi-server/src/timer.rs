//! A small registry of named periodic tasks, advanced cooperatively by the
//! consume loop's bounded wait (`spec.md` §4.3).
//!
//! Grounded on the original source's `Rabbit.timers` dict and
//! `Timer.run()` (`original_source/mpi/rabbit.py`): a name -> timer map,
//! with due-detection iterating a snapshot so a caller that mutates the
//! timer set while processing due timers (adds/removes one) doesn't
//! invalidate an in-progress iteration -- the same defense the Python
//! takes with `list(self.timers.items())`.
//!
//! One deliberate departure from the source's shape: the Python `Timer`
//! stores the callback itself and `check_timers` invokes it in place. In
//! Rust, a callback owned by `TimerSet` cannot also hold a mutable
//! reference to the sibling fields (`RecordStore`, `Transport`) of the
//! `SessionEngine` that owns both the timer set and the data the callback
//! needs to mutate -- that's a self-referential borrow the checker
//! rejects. So `TimerSet` only tracks *when* a timer is due
//! ([`TimerSet::due_names`]); [`crate::engine::SessionEngine`] performs
//! the actual dispatch and then reports completion via
//! [`TimerSet::mark_ran`]. The externally observable contract --
//! synchronous invocation, snapshot iteration, completion-based
//! rescheduling -- is unchanged; see `DESIGN.md`.

use std::collections::HashMap;
use std::sync::Arc;

use pi_core::Clock;

struct TimerEntry {
    interval_secs: i64,
    last_run: i64,
}

/// Registry of named periodic tasks.
///
/// Firing drifts rather than strictly phase-locks: if handling a due timer
/// takes longer than its interval, the next firing is scheduled from
/// completion, not from the missed slot (`spec.md` §4.3) -- intentional,
/// matching the source.
pub struct TimerSet {
    clock: Arc<dyn Clock>,
    timers: HashMap<String, TimerEntry>,
}

impl TimerSet {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: HashMap::new(),
        }
    }

    /// Registers (or replaces) a named timer. `last_run` is set to now on
    /// insertion, so the first firing happens no sooner than one full
    /// `interval_secs` from registration.
    pub fn add(&mut self, name: impl Into<String>, interval_secs: i64) {
        let now = self.clock.now();
        self.timers.insert(
            name.into(),
            TimerEntry {
                interval_secs,
                last_run: now,
            },
        );
    }

    /// Removes a named timer. Idempotent -- removing an absent timer is a
    /// no-op.
    pub fn delete(&mut self, name: &str) {
        self.timers.remove(name);
    }

    /// Names of every timer whose interval has elapsed, as a snapshot
    /// (safe for the caller to mutate the timer set while processing the
    /// result).
    #[must_use]
    pub fn due_names(&self) -> Vec<String> {
        let now = self.clock.now();
        self.timers
            .iter()
            .filter(|(_, t)| t.last_run + t.interval_secs <= now)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Records that `name` just finished running, resetting its interval
    /// from the current time. No-op if `name` is no longer registered
    /// (e.g. deleted mid-dispatch).
    pub fn mark_ran(&mut self, name: &str) {
        let now = self.clock.now();
        if let Some(entry) = self.timers.get_mut(name) {
            entry.last_run = now;
        }
    }

    #[cfg(test)]
    fn is_registered(&self, name: &str) -> bool {
        self.timers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pi_core::VirtualClock;

    #[test]
    fn timer_becomes_due_once_interval_elapses() {
        let clock = Arc::new(VirtualClock::new(0));
        let mut timers = TimerSet::new(clock.clone());
        timers.add("t", 10);

        assert!(timers.due_names().is_empty());

        clock.advance(10);
        assert_eq!(timers.due_names(), vec!["t".to_string()]);
    }

    #[test]
    fn mark_ran_resets_the_interval_from_completion() {
        let clock = Arc::new(VirtualClock::new(0));
        let mut timers = TimerSet::new(clock.clone());
        timers.add("t", 10);

        clock.advance(15);
        assert_eq!(timers.due_names(), vec!["t".to_string()]);
        timers.mark_ran("t");
        assert!(timers.due_names().is_empty());

        clock.advance(10);
        assert_eq!(timers.due_names(), vec!["t".to_string()]);
    }

    #[test]
    fn re_adding_a_timer_replaces_its_interval() {
        let clock = Arc::new(VirtualClock::new(0));
        let mut timers = TimerSet::new(clock.clone());
        timers.add("t", 10);
        timers.add("t", 20);

        clock.advance(10);
        assert!(timers.due_names().is_empty(), "replaced with 20s interval");

        clock.advance(10);
        assert_eq!(timers.due_names(), vec!["t".to_string()]);
    }

    #[test]
    fn delete_is_idempotent() {
        let clock = Arc::new(VirtualClock::new(0));
        let mut timers = TimerSet::new(clock);
        timers.delete("nonexistent");
        assert!(!timers.is_registered("nonexistent"));
    }

    #[test]
    fn mark_ran_on_deleted_timer_is_a_noop() {
        let clock = Arc::new(VirtualClock::new(0));
        let mut timers = TimerSet::new(clock);
        timers.add("t", 10);
        timers.delete("t");
        timers.mark_ran("t");
        assert!(!timers.is_registered("t"));
    }
}
