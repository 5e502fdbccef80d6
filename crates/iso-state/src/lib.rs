//! # iso-state — Store Handle Lifecycle
//!
//! Implements the lifecycle that gates every store operation.
//!
//! ## State Machine
//!
//! ```text
//!            close()             dispose()
//!   Open ──────────────▶ Closed ───────────▶ Disposed
//!     │                                          ▲
//!     │ remove()                    dispose()    │
//!     └──────────────▶ Removed ──────────────────┘
//! ```
//!
//! `Open` is the only state in which operations run. `Closed` and
//! `Disposed` are per-handle. `Removed` is store-wide: it is recorded in the
//! [`StoreLiveness`] flag every sibling handle shares, so a handle that never
//! issued the removal still observes it.
//!
//! ## Design
//!
//! The lifecycle is an enum with validated transitions rather than a
//! typestate. Handles are shared across threads and sibling handles change
//! each other's observable state, so the state has to be inspected at run
//! time on every call.

pub mod lifecycle;
pub mod liveness;

pub use lifecycle::{HandleId, Lifecycle, LifecycleState, TransitionRecord};
pub use liveness::{LiveGuard, RemovalGuard, StoreLiveness};
