//! # Shared Store Registry
//!
//! Every handle on one store root shares a single [`SharedStore`]: the quota
//! entry, the liveness flag, the path locks and the open-stream tickets.
//! The registry hands out that shared state, keyed by the root's absolute
//! path.
//!
//! ## Lock Order
//!
//! The registry map is taken before the quota ledger, and the ledger is only
//! mutated under the map lock. Removal drops its liveness guard before it
//! evicts the store, so it never holds liveness and the map at once.
//!
//! Within a store: liveness, then path stripes in index order, then the
//! stream ticket list, then a single ticket.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, MutexGuard};

use iso_core::{ContainedPath, IsoError, StoreRoot};
use iso_quota::{QuotaEntry, QuotaLedger, QuotaPolicy};
use iso_state::{LiveGuard, StoreLiveness};

use crate::fs_port::{tree_size, FileSystemPort};

/// Number of striped path locks per store.
pub const PATH_LOCK_STRIPES: usize = 64;

// ---------------------------------------------------------------------------
// SharedStore
// ---------------------------------------------------------------------------

/// State shared by every handle on one store root.
#[derive(Debug)]
pub struct SharedStore {
    root: StoreRoot,
    quota: Arc<QuotaEntry>,
    liveness: StoreLiveness,
    stripes: Vec<Mutex<()>>,
    tickets: Mutex<Vec<Weak<FileTicket>>>,
}

/// Where an open stream's file currently lives in the store.
///
/// Moves retarget the ticket; deleting the file detaches it. The path only
/// changes while the stripes of both the old and new path are held.
#[derive(Debug)]
pub struct FileTicket {
    path: Mutex<ContainedPath>,
    detached: AtomicBool,
}

impl FileTicket {
    pub fn path(&self) -> ContainedPath {
        self.path.lock().clone()
    }

    /// Whether the file has been deleted out from under the stream.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

/// Guards for the stripes covering one or two paths, held in index order.
#[derive(Debug)]
pub struct PathLocks<'a> {
    _guards: Vec<MutexGuard<'a, ()>>,
}

impl SharedStore {
    fn new(root: StoreRoot, quota: Arc<QuotaEntry>) -> Self {
        Self {
            root,
            quota,
            liveness: StoreLiveness::new(),
            stripes: (0..PATH_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            tickets: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &StoreRoot {
        &self.root
    }

    pub fn quota(&self) -> &Arc<QuotaEntry> {
        &self.quota
    }

    pub fn liveness(&self) -> &StoreLiveness {
        &self.liveness
    }

    pub fn is_removed(&self) -> bool {
        self.liveness.is_removed()
    }

    /// Enter the store for one operation.
    ///
    /// # Errors
    ///
    /// [`IsoError::OperationFailed`] if the store has been removed.
    pub fn enter(&self) -> Result<LiveGuard<'_>, IsoError> {
        let guard = self.liveness.enter();
        if guard.is_removed() {
            return Err(IsoError::failed("the store has been removed"));
        }
        Ok(guard)
    }

    /// Lock the stripe covering `path`.
    pub fn lock_path(&self, path: &ContainedPath) -> PathLocks<'_> {
        PathLocks {
            _guards: vec![self.stripes[stripe_of(path)].lock()],
        }
    }

    /// Lock the stripes covering both paths, lowest index first.
    pub fn lock_paths(&self, a: &ContainedPath, b: &ContainedPath) -> PathLocks<'_> {
        let (i, j) = (stripe_of(a), stripe_of(b));
        let (lo, hi) = (i.min(j), i.max(j));
        let mut guards = vec![self.stripes[lo].lock()];
        if hi != lo {
            guards.push(self.stripes[hi].lock());
        }
        PathLocks { _guards: guards }
    }

    /// Lock every stripe, lowest index first. Used by operations that
    /// relocate a whole subtree.
    pub fn lock_all(&self) -> PathLocks<'_> {
        PathLocks {
            _guards: self.stripes.iter().map(|s| s.lock()).collect(),
        }
    }

    /// Lock the stripe of the file behind `ticket`, following any move that
    /// lands between reading its path and taking the lock.
    ///
    /// # Errors
    ///
    /// [`IsoError::OperationFailed`] if the file has been deleted.
    pub fn lock_ticket(&self, ticket: &FileTicket) -> Result<PathLocks<'_>, IsoError> {
        loop {
            let path = ticket.path();
            let locks = self.lock_path(&path);
            if *ticket.path.lock() != path {
                continue;
            }
            if ticket.is_detached() {
                return Err(IsoError::failed(format!("{path} was deleted")));
            }
            return Ok(locks);
        }
    }

    /// Track a stream opened on `path`. The caller holds the path's stripe.
    pub(crate) fn register_stream(&self, path: &ContainedPath) -> Arc<FileTicket> {
        let ticket = Arc::new(FileTicket {
            path: Mutex::new(path.clone()),
            detached: AtomicBool::new(false),
        });
        let mut tickets = self.tickets.lock();
        tickets.retain(|t| t.strong_count() > 0);
        tickets.push(Arc::downgrade(&ticket));
        ticket
    }

    /// Detach the streams open on the file at `path`. The caller holds the
    /// path's stripe and has just unlinked the file.
    pub(crate) fn detach_streams(&self, path: &ContainedPath) {
        for ticket in self.tickets.lock().iter().filter_map(Weak::upgrade) {
            if *ticket.path.lock() == *path {
                ticket.detached.store(true, Ordering::Release);
            }
        }
    }

    /// Point streams on `from`, or on anything below it, at the same entry
    /// under `to`. The caller holds the stripes of both paths.
    pub(crate) fn retarget_streams(&self, from: &ContainedPath, to: &ContainedPath) {
        for ticket in self.tickets.lock().iter().filter_map(Weak::upgrade) {
            let mut path = ticket.path.lock();
            if let Some(moved) = path.rebase(from, to) {
                *path = moved;
            }
        }
    }
}

fn stripe_of(path: &ContainedPath) -> usize {
    let mut hasher = DefaultHasher::new();
    path.segments().hash(&mut hasher);
    (hasher.finish() % PATH_LOCK_STRIPES as u64) as usize
}

// ---------------------------------------------------------------------------
// StoreRegistry
// ---------------------------------------------------------------------------

/// Map from store root path to its shared state.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: Mutex<HashMap<PathBuf, Arc<SharedStore>>>,
    ledger: QuotaLedger,
}

static GLOBAL: OnceLock<Arc<StoreRegistry>> = OnceLock::new();

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by default.
    pub fn global() -> Arc<StoreRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(StoreRegistry::new())))
    }

    /// Return the shared state for `root`, creating it on first use.
    ///
    /// A new quota entry takes its ceiling from `policy` and its initial
    /// usage from the bytes already under the root. A store found in the
    /// removed state is replaced by a fresh one.
    pub fn attach(
        &self,
        root: &StoreRoot,
        policy: &dyn QuotaPolicy,
        fs: &dyn FileSystemPort,
    ) -> Result<Arc<SharedStore>, IsoError> {
        let mut stores = self.stores.lock();
        if let Some(existing) = stores.get(root.path()) {
            if !existing.is_removed() {
                return Ok(Arc::clone(existing));
            }
            self.ledger.destroy(existing.root());
            stores.remove(root.path());
        }
        fs.mkdir_all(root.path())?;

        let quota = self.ledger.open_entry(root, policy.ceiling(root), || {
            Ok(tree_size(fs, root.path())?)
        })?;
        let shared = Arc::new(SharedStore::new(root.clone(), quota));
        stores.insert(root.path().to_path_buf(), Arc::clone(&shared));
        tracing::debug!(scope = %root.scope(), used = shared.quota.usage().used, "attached store");
        Ok(shared)
    }

    /// Drop `shared` from the registry and destroy its quota entry.
    ///
    /// A no-op if the registry already holds a newer store for the root.
    pub fn evict(&self, shared: &Arc<SharedStore>) {
        let mut stores = self.stores.lock();
        let current = stores.get(shared.root.path());
        if current.is_some_and(|c| Arc::ptr_eq(c, shared)) {
            stores.remove(shared.root.path());
            self.ledger.destroy(&shared.root);
        }
    }

    pub fn get(&self, root: &StoreRoot) -> Option<Arc<SharedStore>> {
        self.stores.lock().get(root.path()).cloned()
    }

    pub fn len(&self) -> usize {
        self.stores.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.lock().is_empty()
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }
}
