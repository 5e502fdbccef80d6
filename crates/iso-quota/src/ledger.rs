//! # Quota Ledger and Entries
//!
//! `QuotaLedger` maps each [`StoreRoot`] to its shared [`QuotaEntry`]. The
//! map and each entry sit behind their own `parking_lot::Mutex`:
//! reservations on different stores never contend, and every
//! read-modify-write of one entry's counters is a single critical section.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use iso_core::{IsoError, ScopeId, StoreRoot};

/// Point-in-time counters of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Bytes currently charged to the store.
    pub used: u64,
    /// Byte ceiling for the store.
    pub quota: u64,
}

impl QuotaUsage {
    /// Bytes still available, saturating at zero.
    pub fn available(&self) -> u64 {
        self.quota.saturating_sub(self.used)
    }
}

// ---------------------------------------------------------------------------
// QuotaEntry
// ---------------------------------------------------------------------------

/// Byte counters of one store, shared by every handle on it.
#[derive(Debug)]
pub struct QuotaEntry {
    scope: ScopeId,
    usage: Mutex<QuotaUsage>,
}

impl QuotaEntry {
    pub fn new(scope: ScopeId, used: u64, quota: u64) -> Self {
        Self {
            scope,
            usage: Mutex::new(QuotaUsage { used, quota }),
        }
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    pub fn usage(&self) -> QuotaUsage {
        *self.usage.lock()
    }

    /// Charge `bytes` to the store.
    ///
    /// Reserving zero bytes always succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::QuotaExceeded`] if the reservation would take
    /// usage past the ceiling. The counters are left untouched.
    pub fn reserve(&self, bytes: u64) -> Result<(), IsoError> {
        if bytes == 0 {
            return Ok(());
        }
        let mut usage = self.usage.lock();
        match usage.used.checked_add(bytes) {
            Some(next) if next <= usage.quota => {
                usage.used = next;
                Ok(())
            }
            _ => Err(IsoError::QuotaExceeded {
                requested: bytes,
                used: usage.used,
                quota: usage.quota,
            }),
        }
    }

    /// Return `bytes` to the store. Never fails; saturates at zero.
    pub fn release(&self, bytes: u64) {
        if bytes == 0 {
            return;
        }
        let mut usage = self.usage.lock();
        if bytes > usage.used {
            tracing::warn!(
                scope = %self.scope,
                bytes,
                used = usage.used,
                "quota release exceeds recorded usage; clamping to zero"
            );
        }
        usage.used = usage.used.saturating_sub(bytes);
    }

    /// Move a charge from `old_len` to `new_len`: reserve growth, release shrinkage.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::QuotaExceeded`] if growth does not fit.
    pub fn resize(&self, old_len: u64, new_len: u64) -> Result<(), IsoError> {
        if new_len > old_len {
            self.reserve(new_len - old_len)
        } else {
            self.release(old_len - new_len);
            Ok(())
        }
    }

    /// Raise the ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::InvalidArgument`] unless `new_quota` is strictly
    /// greater than the current ceiling.
    pub fn increase_quota_to(&self, new_quota: u64) -> Result<(), IsoError> {
        let mut usage = self.usage.lock();
        if new_quota <= usage.quota {
            return Err(IsoError::InvalidArgument(format!(
                "new quota {new_quota} must be greater than the current quota {}",
                usage.quota
            )));
        }
        tracing::info!(scope = %self.scope, from = usage.quota, to = new_quota, "quota increased");
        usage.quota = new_quota;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// QuotaLedger
// ---------------------------------------------------------------------------

/// Registry of quota entries keyed by store root.
#[derive(Debug, Default)]
pub struct QuotaLedger {
    entries: Mutex<HashMap<StoreRoot, Arc<QuotaEntry>>>,
}

impl QuotaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `root`, creating it on first use.
    ///
    /// On creation, `initial_used` supplies the bytes already stored under the
    /// root. It runs at most once per entry, under the ledger lock, so two
    /// concurrent first opens never double-count.
    ///
    /// # Errors
    ///
    /// Propagates the error of `initial_used`; no entry is created then.
    pub fn open_entry<F>(
        &self,
        root: &StoreRoot,
        quota: u64,
        initial_used: F,
    ) -> Result<Arc<QuotaEntry>, IsoError>
    where
        F: FnOnce() -> Result<u64, IsoError>,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(root) {
            return Ok(Arc::clone(entry));
        }
        let used = initial_used()?;
        let entry = Arc::new(QuotaEntry::new(root.scope().clone(), used, quota));
        entries.insert(root.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Destroy the entry for `root`, returning it if it existed.
    ///
    /// Handles still holding the entry keep a detached copy.
    pub fn destroy(&self, root: &StoreRoot) -> Option<Arc<QuotaEntry>> {
        self.entries.lock().remove(root)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso_core::{AssemblyId, ErrorKind, IdentityEvidence, PresetScope, UserId};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn root(user: &str) -> StoreRoot {
        let desc = PresetScope::UserStoreForAssembly.descriptor();
        let ev = IdentityEvidence::empty()
            .with_user(UserId::new(user).unwrap())
            .with_assembly(AssemblyId::new("test.exe").unwrap());
        StoreRoot::under(Path::new("/stores"), desc, desc.scope_id(&ev).unwrap())
    }

    fn entry(used: u64, quota: u64) -> QuotaEntry {
        QuotaEntry::new(root("u").scope().clone(), used, quota)
    }

    #[test]
    fn reserve_within_ceiling() {
        let e = entry(0, 100);
        e.reserve(60).unwrap();
        e.reserve(40).unwrap();
        assert_eq!(e.usage(), QuotaUsage { used: 100, quota: 100 });
        assert_eq!(e.usage().available(), 0);
    }

    #[test]
    fn failed_reserve_leaves_entry_unchanged() {
        let e = entry(70, 100);
        let err = e.reserve(31).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
        assert_eq!(e.usage().used, 70);
    }

    #[test]
    fn reserve_overflow_is_quota_exceeded() {
        let e = entry(10, u64::MAX);
        assert_eq!(e.reserve(u64::MAX).unwrap_err().kind(), ErrorKind::QuotaExceeded);
        assert_eq!(e.usage().used, 10);
    }

    #[test]
    fn zero_reservation_always_succeeds() {
        let e = entry(200, 100);
        e.reserve(0).unwrap();
        assert_eq!(e.usage().used, 200);
    }

    #[test]
    fn release_saturates() {
        let e = entry(10, 100);
        e.release(4);
        assert_eq!(e.usage().used, 6);
        e.release(50);
        assert_eq!(e.usage().used, 0);
    }

    #[test]
    fn resize_grows_and_shrinks() {
        let e = entry(0, 10);
        e.resize(0, 8).unwrap();
        assert_eq!(e.usage().used, 8);
        e.resize(8, 3).unwrap();
        assert_eq!(e.usage().used, 3);
        assert!(e.resize(3, 11).is_err());
        assert_eq!(e.usage().used, 3);
    }

    #[test]
    fn increase_quota_must_grow() {
        let e = entry(0, 10);
        assert_eq!(e.increase_quota_to(10).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(e.increase_quota_to(5).unwrap_err().kind(), ErrorKind::InvalidArgument);
        e.increase_quota_to(20).unwrap();
        assert_eq!(e.usage().quota, 20);
    }

    #[test]
    fn concurrent_reservations_never_overshoot() {
        let e = Arc::new(entry(0, 1000));
        let wins = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let e = Arc::clone(&e);
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    for _ in 0..10 {
                        if e.reserve(10).is_ok() {
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 100);
        assert_eq!(e.usage().used, 1000);
    }

    #[test]
    fn ledger_shares_entry_per_root() {
        let ledger = QuotaLedger::new();
        let r = root("alice");
        let a = ledger.open_entry(&r, 100, || Ok(5)).unwrap();
        let b = ledger
            .open_entry(&r, 999, || panic!("initial usage must not be rescanned"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        a.reserve(10).unwrap();
        assert_eq!(b.usage(), QuotaUsage { used: 15, quota: 100 });
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn ledger_separates_roots() {
        let ledger = QuotaLedger::new();
        let alice = ledger.open_entry(&root("alice"), 100, || Ok(0)).unwrap();
        let bob = ledger.open_entry(&root("bob"), 100, || Ok(0)).unwrap();
        alice.reserve(100).unwrap();
        bob.reserve(100).unwrap();
        assert!(!Arc::ptr_eq(&alice, &bob));
        assert_eq!(ledger.len(), 2);
        assert_eq!(alice.usage().used, 100);
        assert_eq!(bob.usage().used, 100);
    }

    #[test]
    fn ledger_scan_failure_creates_nothing() {
        let ledger = QuotaLedger::new();
        let err = ledger
            .open_entry(&root("alice"), 100, || Err(IsoError::failed("scan")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert!(ledger.is_empty());
    }

    #[test]
    fn destroy_detaches_entry() {
        let ledger = QuotaLedger::new();
        let r = root("alice");
        let held = ledger.open_entry(&r, 100, || Ok(0)).unwrap();
        held.reserve(40).unwrap();
        assert!(ledger.destroy(&r).is_some());
        assert!(ledger.is_empty());
        held.release(40);
        assert_eq!(held.usage().used, 0);

        let fresh = ledger.open_entry(&r, 100, || Ok(0)).unwrap();
        assert!(!Arc::ptr_eq(&held, &fresh));
        assert_eq!(fresh.usage().used, 0);
    }
}
