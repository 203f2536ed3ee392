//! Checkout ledger and total resource count

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::trace;

/// Pool-assigned identity of a resource, stable for its whole life.
pub type ResourceId = u64;

/// Tracks which resources are checked out and until when, plus the total
/// number of resources that exist or are being built.
pub(crate) struct Ledger {
    expires: DashMap<ResourceId, Instant>,
    total: AtomicUsize,
    next_id: AtomicU64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            expires: DashMap::new(),
            total: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> ResourceId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    pub fn checked_out(&self) -> usize {
        self.expires.len()
    }

    /// Claim a slot for a resource that is about to exist.
    ///
    /// Succeeds when `max` is unbounded or the total is below it.
    pub fn try_reserve(&self, max: Option<usize>) -> bool {
        self.total
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |total| match max {
                Some(max) if total >= max => None,
                _ => Some(total + 1),
            })
            .is_ok()
    }

    /// Give a slot back. Never goes below zero.
    pub fn release_slot(&self) {
        let _ = self
            .total
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |total| total.checked_sub(1));
    }

    pub fn check_out(&self, id: ResourceId, expires_at: Instant) {
        self.expires.insert(id, expires_at);
    }

    /// Remove the entry for `id`; `false` if it had already been swept.
    pub fn check_in(&self, id: ResourceId) -> bool {
        self.expires.remove(&id).is_some()
    }

    /// Drop every checkout whose deadline is at or before `now`, releasing
    /// its slot. Returns how many were dropped.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let expired: Vec<ResourceId> = self
            .expires
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| *entry.key())
            .collect();

        let mut swept = 0;
        for id in expired {
            // A concurrent return may have won the race for this entry.
            if self.expires.remove_if(&id, |_, deadline| *deadline <= now).is_some() {
                self.release_slot();
                swept += 1;
                trace!(id, "Checkout expired");
            }
        }
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reserve_respects_max() {
        let ledger = Ledger::new();
        assert!(ledger.try_reserve(Some(2)));
        assert!(ledger.try_reserve(Some(2)));
        assert!(!ledger.try_reserve(Some(2)));
        assert_eq!(ledger.total(), 2);
    }

    #[test]
    fn test_reserve_unbounded() {
        let ledger = Ledger::new();
        for _ in 0..100 {
            assert!(ledger.try_reserve(None));
        }
        assert_eq!(ledger.total(), 100);
    }

    #[test]
    fn test_release_never_underflows() {
        let ledger = Ledger::new();
        ledger.release_slot();
        assert_eq!(ledger.total(), 0);
        assert!(ledger.try_reserve(None));
        ledger.release_slot();
        ledger.release_slot();
        assert_eq!(ledger.total(), 0);
    }

    #[test]
    fn test_check_in_only_once() {
        let ledger = Ledger::new();
        let id = ledger.next_id();
        ledger.check_out(id, Instant::now() + Duration::from_secs(10));
        assert_eq!(ledger.checked_out(), 1);
        assert!(ledger.check_in(id));
        assert!(!ledger.check_in(id));
        assert_eq!(ledger.checked_out(), 0);
    }

    #[test]
    fn test_sweep_releases_expired_only() {
        let ledger = Ledger::new();
        let now = Instant::now();
        assert!(ledger.try_reserve(None));
        assert!(ledger.try_reserve(None));
        ledger.check_out(1, now);
        ledger.check_out(2, now + Duration::from_secs(60));

        assert_eq!(ledger.sweep_expired(now), 1);
        assert_eq!(ledger.total(), 1);
        assert!(!ledger.check_in(1));
        assert!(ledger.check_in(2));
    }

    #[test]
    fn test_ids_are_unique() {
        let ledger = Ledger::new();
        let a = ledger.next_id();
        let b = ledger.next_id();
        assert_ne!(a, b);
    }
}
