//! # iso-quota — Quota Ledger
//!
//! Byte accounting for isolated stores. Every store root has exactly one
//! [`QuotaEntry`], shared by all handles on that root. The entry enforces a
//! byte ceiling with atomic reservation and infallible release.
//!
//! ## Invariants
//!
//! - After a successful reservation, bytes used never exceed the ceiling.
//! - A failed reservation leaves the entry unchanged.
//! - Entries outlive handle close/dispose; only store removal destroys them.
//!
//! The ceiling itself comes from a [`QuotaPolicy`].

pub mod ledger;
pub mod policy;

pub use ledger::{QuotaEntry, QuotaLedger, QuotaUsage};
pub use policy::{FixedQuota, QuotaPolicy, ScopedQuota};
