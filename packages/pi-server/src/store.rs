//! The in-process session index: `spec.md` §4.1's `RecordStore`.
//!
//! Backed by a `HashMap<phone, Session>` plus a secondary ordering index
//! (`BTreeSet<(Reverse<date_created>, phone)>`) that makes
//! [`RecordStore::select_eligible`]'s "newest `date_created` first, phone
//! ascending on ties" ordering (`spec.md` §4.1) a tree walk rather than a
//! sort on every call. `date_created` never changes after insertion
//! (`spec.md` §3 Lifecycle — a `start` refresh only bumps `last_active`),
//! so the index never needs re-balancing outside of insert/remove.
//!
//! `spec.md` §5 establishes there is exactly one mutator (the single
//! cooperative task running `handle`/`publish_manifest`), so unlike the
//! teacher's `storage::engines::HashMapStorage` this does not reach for
//! `DashMap` or any interior locking -- there is nothing concurrent to
//! guard against. See `DESIGN.md`.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use pi_core::{Clock, Session};

/// Raised by [`RecordStore::insert`] when `phone` is already present.
///
/// `spec.md` §4.1/§7: the engine always calls `get` before `insert`, so
/// reaching this is a programmer error, not a recoverable condition.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("duplicate key: phone already present in store")]
pub struct DuplicateKey;

/// The session index. One instance per running engine.
pub struct RecordStore {
    clock: Arc<dyn Clock>,
    records: HashMap<String, Session>,
    /// `(Reverse(date_created), phone)` -- ascending order over this tuple
    /// yields date_created descending, phone ascending on ties.
    order_index: BTreeSet<(Reverse<i64>, String)>,
}

impl RecordStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            records: HashMap::new(),
            order_index: BTreeSet::new(),
        }
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Inserts a freshly-started session. Errors if `phone` is already
    /// present -- callers must check [`RecordStore::get`] first.
    pub fn insert(
        &mut self,
        phone: String,
        ip_addr: String,
        region: String,
        guid: String,
        description: String,
    ) -> Result<(), DuplicateKey> {
        if self.records.contains_key(&phone) {
            return Err(DuplicateKey);
        }
        let now = self.now();
        let session = Session::new(phone.clone(), ip_addr, region, description, guid, now);
        self.order_index
            .insert((Reverse(session.date_created), phone.clone()));
        self.records.insert(phone, session);
        Ok(())
    }

    /// Returns a clone of the record for `phone`, if present.
    #[must_use]
    pub fn get(&self, phone: &str) -> Option<Session> {
        self.records.get(phone).cloned()
    }

    /// Sets `last_active := now` on an existing record. No-op if absent.
    pub fn touch(&mut self, phone: &str) {
        let now = self.now();
        if let Some(record) = self.records.get_mut(phone) {
            record.last_active = now;
        }
    }

    fn remove_from_index(&mut self, session: &Session) {
        self.order_index
            .remove(&(Reverse(session.date_created), session.phone.clone()));
    }

    /// Deletes the record for `phone` unless it is in cooldown.
    ///
    /// Returns the number of rows removed (0 or 1), matching the source's
    /// `rowcount` convention so the caller can distinguish "deleted" from
    /// "unknown phone" from "in cooldown" (both of the latter return 0).
    pub fn delete_if_not_in_cooldown(&mut self, phone: &str) -> usize {
        let Some(session) = self.records.get(phone) else {
            return 0;
        };
        if session.cooldown_expiry.is_some() {
            return 0;
        }
        let session = self.records.remove(phone).expect("checked above");
        self.remove_from_index(&session);
        1
    }

    /// Removes records whose active window has closed and are not in
    /// cooldown. Returns the count removed.
    pub fn delete_expired(&mut self, active_time: i64) -> usize {
        let now = self.now();
        let expired: Vec<String> = self
            .records
            .values()
            .filter(|s| s.is_expired(active_time, now))
            .map(|s| s.phone.clone())
            .collect();

        for phone in &expired {
            if let Some(session) = self.records.remove(phone) {
                self.remove_from_index(&session);
            }
        }
        expired.len()
    }

    /// Removes records whose cooldown has fully elapsed. Returns the count
    /// removed.
    pub fn delete_finished_cooldown(&mut self) -> usize {
        let now = self.now();
        let finished: Vec<String> = self
            .records
            .values()
            .filter(|s| s.cooldown_finished(now))
            .map(|s| s.phone.clone())
            .collect();

        for phone in &finished {
            if let Some(session) = self.records.remove(phone) {
                self.remove_from_index(&session);
            }
        }
        finished.len()
    }

    /// Returns eligible records (`spec.md` I3), newest `date_created`
    /// first, ties broken by `phone` ascending.
    #[must_use]
    pub fn select_eligible(&self, active_time: i64) -> Vec<Session> {
        let now = self.now();
        self.order_index
            .iter()
            .filter_map(|(_, phone)| self.records.get(phone))
            .filter(|s| s.is_eligible(active_time, now))
            .cloned()
            .collect()
    }

    /// Sets `tasked_time := now` for each named phone. Unknown phones are
    /// silently skipped.
    pub fn mark_tasked(&mut self, phones: &[String]) {
        let now = self.now();
        for phone in phones {
            if let Some(session) = self.records.get_mut(phone) {
                session.tasked_time = Some(now);
            }
        }
    }

    /// Sends every previously-tasked record into cooldown.
    ///
    /// `spec.md` §4.2/§9: intentionally coarse -- cools every tasked
    /// record, not just enough to reach `manifest_size`. Idempotent within
    /// the same second.
    pub fn send_all_tasked_to_cooldown(&mut self, cooldown_time: i64) {
        let now = self.now();
        for session in self.records.values_mut() {
            if session.tasked_time.is_some() {
                session.cooldown_expiry = Some(now + cooldown_time);
            }
        }
    }

    /// Releases cooldown on records whose own active window has not
    /// closed -- they would still be eligible if released.
    pub fn release_recent_from_cooldown(&mut self, active_time: i64) {
        let now = self.now();
        for session in self.records.values_mut() {
            if session.cooldown_expiry.is_some() && session.last_active + active_time > now {
                session.cooldown_expiry = None;
            }
        }
    }

    /// Total number of records currently tracked (includes records in
    /// cooldown).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pi_core::VirtualClock;

    fn store_at(now: i64) -> (RecordStore, Arc<VirtualClock>) {
        let clock = Arc::new(VirtualClock::new(now));
        (RecordStore::new(clock.clone()), clock)
    }

    fn insert(store: &mut RecordStore, phone: &str) {
        store
            .insert(
                phone.to_string(),
                "1.2.3.4".into(),
                "us".into(),
                "guid".into(),
                "desc".into(),
            )
            .unwrap();
    }

    #[test]
    fn duplicate_insert_is_an_error() {
        let (mut store, _clock) = store_at(0);
        insert(&mut store, "A");
        let err = store.insert(
            "A".into(),
            "1.2.3.4".into(),
            "us".into(),
            "g".into(),
            "d".into(),
        );
        assert_eq!(err, Err(DuplicateKey));
    }

    #[test]
    fn touch_bumps_last_active_not_date_created() {
        let (mut store, clock) = store_at(1_000_000);
        insert(&mut store, "A");
        clock.advance(10);
        store.touch("A");
        let record = store.get("A").unwrap();
        assert_eq!(record.date_created, 1_000_000);
        assert_eq!(record.last_active, 1_000_010);
    }

    #[test]
    fn touch_unknown_phone_is_noop() {
        let (mut store, _clock) = store_at(0);
        store.touch("ghost");
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn delete_if_not_in_cooldown_removes_once() {
        let (mut store, _clock) = store_at(0);
        insert(&mut store, "A");
        assert_eq!(store.delete_if_not_in_cooldown("A"), 1);
        assert_eq!(store.delete_if_not_in_cooldown("A"), 0);
    }

    #[test]
    fn delete_if_not_in_cooldown_is_noop_during_cooldown() {
        let (mut store, _clock) = store_at(0);
        insert(&mut store, "A");
        store.mark_tasked(&["A".to_string()]);
        store.send_all_tasked_to_cooldown(300);
        assert_eq!(store.delete_if_not_in_cooldown("A"), 0);
        assert!(store.get("A").is_some());
    }

    #[test]
    fn select_eligible_orders_by_date_created_desc_then_phone_asc() {
        let (mut store, clock) = store_at(1_000_000);
        insert(&mut store, "B");
        clock.advance(1);
        insert(&mut store, "A");
        clock.advance(1);
        insert(&mut store, "C");

        let eligible = store.select_eligible(60);
        let phones: Vec<_> = eligible.iter().map(|s| s.phone.clone()).collect();
        assert_eq!(phones, vec!["C", "A", "B"]);
    }

    #[test]
    fn select_eligible_ties_break_on_phone_ascending() {
        let clock = Arc::new(VirtualClock::new(1_000_000));
        let mut store = RecordStore::new(clock);
        // Same `now` for both -> same date_created.
        insert(&mut store, "B");
        insert(&mut store, "A");

        let eligible = store.select_eligible(60);
        let phones: Vec<_> = eligible.iter().map(|s| s.phone.clone()).collect();
        assert_eq!(phones, vec!["A", "B"]);
    }

    #[test]
    fn delete_expired_removes_only_expired_non_cooldown_records() {
        let (mut store, clock) = store_at(1_000_000);
        insert(&mut store, "A");
        clock.advance(61);
        assert_eq!(store.delete_expired(60), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_expired_spares_cooldown_records() {
        let (mut store, clock) = store_at(1_000_000);
        insert(&mut store, "A");
        store.mark_tasked(&["A".to_string()]);
        store.send_all_tasked_to_cooldown(300);
        clock.advance(61);
        assert_eq!(store.delete_expired(60), 0);
    }

    #[test]
    fn delete_finished_cooldown_removes_elapsed_records() {
        let (mut store, clock) = store_at(1_000_000);
        insert(&mut store, "A");
        store.mark_tasked(&["A".to_string()]);
        store.send_all_tasked_to_cooldown(300);
        clock.advance(300);
        assert_eq!(store.delete_finished_cooldown(), 1);
    }

    #[test]
    fn release_recent_from_cooldown_only_releases_still_active_records() {
        let (mut store, clock) = store_at(1_000_000);
        insert(&mut store, "A");
        insert(&mut store, "B");
        store.mark_tasked(&["A".to_string(), "B".to_string()]);
        store.send_all_tasked_to_cooldown(300);

        clock.advance(50);
        // B's activity window has closed by now (simulate by back-dating).
        {
            let b = store.records.get_mut("B").unwrap();
            b.last_active -= 60;
        }

        store.release_recent_from_cooldown(60);
        assert!(store.get("A").unwrap().cooldown_expiry.is_none());
        assert!(store.get("B").unwrap().cooldown_expiry.is_some());
    }

    #[test]
    fn mark_tasked_skips_unknown_phones() {
        let (mut store, _clock) = store_at(0);
        insert(&mut store, "A");
        store.mark_tasked(&["A".to_string(), "ghost".to_string()]);
        assert!(store.get("A").unwrap().tasked_time.is_some());
    }

    #[test]
    fn send_all_tasked_to_cooldown_is_idempotent_within_a_second() {
        let (mut store, _clock) = store_at(1_000_000);
        insert(&mut store, "A");
        store.mark_tasked(&["A".to_string()]);
        store.send_all_tasked_to_cooldown(300);
        let first = store.get("A").unwrap().cooldown_expiry;
        store.send_all_tasked_to_cooldown(300);
        let second = store.get("A").unwrap().cooldown_expiry;
        assert_eq!(first, second);
    }
}
