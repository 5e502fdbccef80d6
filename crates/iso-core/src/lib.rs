//! # iso-core — Foundational Types for Isolated Storage
//!
//! This crate is the leaf of the isolated-storage workspace. It defines the
//! type-system primitives every other crate builds on and depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identity dimensions.** `UserId`, `DomainId`,
//!    `AssemblyId`, `ApplicationId` all have validated constructors. No bare
//!    strings reach the scope resolver.
//!
//! 2. **`ContainedPath` newtype.** Every store-relative path flows through
//!    `ContainedPath::new()`. Downstream code joins a `ContainedPath` onto a
//!    store root without re-validating, because the only way to obtain one is
//!    through the containment checks.
//!
//! 3. **Stable scope identifiers.** `ScopeId` is a SHA-256 digest of the scope
//!    shape and the resolved identity values. Identity strings never appear in
//!    on-disk paths.
//!
//! 4. **One error taxonomy.** `IsoError` carries every failure kind a store
//!    operation can surface, and `ErrorKind` gives a payload-free discriminant.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `iso-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod path;
pub mod scope;

// Re-export primary types for ergonomic imports.
pub use error::{ErrorKind, IsoError, IsoResult};
pub use identity::{ApplicationId, AssemblyId, DomainId, IdentityEvidence, UserId};
pub use path::{require_argument, ContainedPath};
pub use scope::{PresetScope, ScopeDescriptor, ScopeId, ScopeOwner, StoreRoot};
