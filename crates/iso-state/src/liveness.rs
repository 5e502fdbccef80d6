//! # Store Liveness
//!
//! The store-wide "removed" flag shared by every handle on one store root.
//!
//! Operations hold a [`LiveGuard`] (shared) for their duration; removal
//! holds a [`RemovalGuard`] (exclusive) while it deletes the tree. An
//! operation therefore either completes before the removal starts or
//! observes the store as removed. It never runs against a half-deleted tree.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared liveness flag of one store.
#[derive(Debug, Default)]
pub struct StoreLiveness {
    removed: RwLock<bool>,
}

impl StoreLiveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the flag. Prefer [`enter()`](StoreLiveness::enter) around mutations.
    pub fn is_removed(&self) -> bool {
        *self.removed.read()
    }

    /// Enter the store for one operation.
    pub fn enter(&self) -> LiveGuard<'_> {
        LiveGuard {
            guard: self.removed.read(),
        }
    }

    /// Take exclusive access in order to remove the store.
    pub fn begin_removal(&self) -> RemovalGuard<'_> {
        RemovalGuard {
            guard: self.removed.write(),
        }
    }
}

/// Shared access held by an in-flight operation.
#[derive(Debug)]
pub struct LiveGuard<'a> {
    guard: RwLockReadGuard<'a, bool>,
}

impl LiveGuard<'_> {
    pub fn is_removed(&self) -> bool {
        *self.guard
    }
}

/// Exclusive access held while the store is being removed.
#[derive(Debug)]
pub struct RemovalGuard<'a> {
    guard: RwLockWriteGuard<'a, bool>,
}

impl RemovalGuard<'_> {
    pub fn is_removed(&self) -> bool {
        *self.guard
    }

    /// Record the store as removed. Irreversible.
    pub fn mark_removed(&mut self) {
        *self.guard = true;
    }
}
