//! The `Session` record: the unit of state tracked per customer phone
//! number, and the predicate that governs manifest membership.

/// A single customer session, keyed by `phone`.
///
/// # Invariants
///
/// - `phone` is non-empty and unique within a store (enforced by the store,
///   not this type).
/// - `date_created <= last_active` always.
/// - `tasked_time`, once set, is monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub phone: String,
    pub ip_addr: String,
    pub region: String,
    pub description: String,
    pub guid: String,
    pub date_created: i64,
    pub last_active: i64,
    pub cooldown_expiry: Option<i64>,
    pub tasked_time: Option<i64>,
}

impl Session {
    /// Creates a freshly-started session: `date_created == last_active ==
    /// now`, cooldown and tasked state both unset.
    #[must_use]
    pub fn new(
        phone: String,
        ip_addr: String,
        region: String,
        description: String,
        guid: String,
        now: i64,
    ) -> Self {
        Self {
            phone,
            ip_addr,
            region,
            description,
            guid,
            date_created: now,
            last_active: now,
            cooldown_expiry: None,
            tasked_time: None,
        }
    }

    /// `spec.md` I3/I4: not in cooldown, and still within its active window.
    #[must_use]
    pub fn is_eligible(&self, active_time: i64, now: i64) -> bool {
        self.cooldown_expiry.is_none() && self.last_active + active_time >= now
    }

    /// Whether the session has aged past its active window and is not in
    /// cooldown (cooldown suppresses expiry pruning — it runs its own
    /// clock).
    #[must_use]
    pub fn is_expired(&self, active_time: i64, now: i64) -> bool {
        self.cooldown_expiry.is_none() && self.last_active + active_time <= now
    }

    /// Whether this record's cooldown has fully elapsed.
    #[must_use]
    pub fn cooldown_finished(&self, now: i64) -> bool {
        self.cooldown_expiry.is_some_and(|expiry| expiry <= now)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_session(date_created: i64, last_active_offset: i64, cooldown_expiry: Option<i64>) -> Session {
        let mut s = Session::new("p".into(), "i".into(), "r".into(), "d".into(), "g".into(), date_created);
        s.last_active = date_created + last_active_offset;
        s.cooldown_expiry = cooldown_expiry;
        s
    }

    proptest! {
        // `delete_expired` and `delete_finished_cooldown` (`RecordStore`) each
        // select on one of these predicates -- they must never both claim the
        // same record, or pruning would race with itself.
        #[test]
        fn expired_and_cooldown_finished_are_mutually_exclusive(
            date_created in 0i64..1_000_000,
            last_active_offset in 0i64..10_000,
            cooldown_expiry in proptest::option::of(0i64..2_000_000i64),
            active_time in 0i64..10_000,
            now in 0i64..2_000_000,
        ) {
            let s = arb_session(date_created, last_active_offset, cooldown_expiry);
            prop_assert!(!(s.is_expired(active_time, now) && s.cooldown_finished(now)));
        }

        #[test]
        fn eligible_implies_no_cooldown(
            date_created in 0i64..1_000_000,
            last_active_offset in 0i64..10_000,
            cooldown_expiry in proptest::option::of(0i64..2_000_000i64),
            active_time in 0i64..10_000,
            now in 0i64..2_000_000,
        ) {
            let s = arb_session(date_created, last_active_offset, cooldown_expiry);
            if s.is_eligible(active_time, now) {
                prop_assert!(s.cooldown_expiry.is_none());
            }
        }
    }
}
