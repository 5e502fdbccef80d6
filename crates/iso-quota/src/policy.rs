//! # Quota Policy Sources
//!
//! A [`QuotaPolicy`] supplies the byte ceiling for a store the first time
//! its quota entry is created. Later changes go through
//! [`QuotaEntry::increase_quota_to`](crate::QuotaEntry::increase_quota_to),
//! not through the policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use iso_core::{ScopeId, StoreRoot};

/// Source of per-store byte ceilings.
///
/// Implementations must be deterministic for a given root: every handle
/// opening the same store is expected to see the same initial ceiling.
pub trait QuotaPolicy: Send + Sync + std::fmt::Debug {
    /// Initial byte ceiling for `root`.
    fn ceiling(&self, root: &StoreRoot) -> u64;
}

/// One ceiling for every store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedQuota(pub u64);

impl QuotaPolicy for FixedQuota {
    fn ceiling(&self, _root: &StoreRoot) -> u64 {
        self.0
    }
}

/// A default ceiling with administrative per-scope overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedQuota {
    pub default: u64,
    #[serde(default)]
    pub overrides: HashMap<ScopeId, u64>,
}

impl ScopedQuota {
    pub fn new(default: u64) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, scope: ScopeId, ceiling: u64) -> Self {
        self.overrides.insert(scope, ceiling);
        self
    }
}

impl QuotaPolicy for ScopedQuota {
    fn ceiling(&self, root: &StoreRoot) -> u64 {
        self.overrides
            .get(root.scope())
            .copied()
            .unwrap_or(self.default)
    }
}
