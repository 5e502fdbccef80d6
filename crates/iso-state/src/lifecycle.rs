//! # Handle Lifecycle State Machine
//!
//! Per-handle state plus the gate every store operation passes through.
//!
//! ## Check Order
//!
//! [`Lifecycle::check()`] reports, in order:
//!
//! 1. `Disposed` → [`IsoError::ObjectDisposed`]
//! 2. `Closed` → [`IsoError::InvalidOperation`]
//! 3. `Removed` (this handle, or the shared store) → [`IsoError::OperationFailed`]
//! 4. `Open` → proceed
//!
//! Argument validation happens before this gate and path-syntax
//! validation after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use iso_core::IsoError;

// ─── Handle identity ─────────────────────────────────────────────────

/// Unique identifier of one store handle, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Generate a new random handle identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}

// ─── State ───────────────────────────────────────────────────────────

/// Lifecycle state of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// All operations permitted.
    Open,
    /// Explicitly closed; the store itself still exists.
    Closed,
    /// Released. Canonical terminal state of a handle.
    Disposed,
    /// The whole store was deleted.
    Removed,
}

impl LifecycleState {
    /// Whether this state is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// Whether operations may run in this state.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Disposed => "DISPOSED",
            Self::Removed => "REMOVED",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: LifecycleState,
    pub to_state: LifecycleState,
    pub at: DateTime<Utc>,
}

// ─── Lifecycle ───────────────────────────────────────────────────────

/// The lifecycle of one store handle.
///
/// Not synchronized; the owning handle wraps it in a lock.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    transitions: Vec<TransitionRecord>,
}

impl Lifecycle {
    /// A freshly opened handle.
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Open,
            transitions: Vec::new(),
        }
    }

    /// This handle's own state, ignoring sibling removals.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The state a caller observes, given whether the shared store was removed.
    pub fn observed(&self, store_removed: bool) -> LifecycleState {
        match self.state {
            LifecycleState::Open if store_removed => LifecycleState::Removed,
            other => other,
        }
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Gate an operation on the current state.
    ///
    /// # Errors
    ///
    /// See the module documentation for the order in which states map to errors.
    pub fn check(&self, store_removed: bool) -> Result<(), IsoError> {
        match self.observed(store_removed) {
            LifecycleState::Disposed => Err(IsoError::ObjectDisposed),
            LifecycleState::Closed => Err(IsoError::InvalidOperation(
                "the store handle has been closed".into(),
            )),
            LifecycleState::Removed => Err(IsoError::OperationFailed(
                "the store has been removed".into(),
            )),
            LifecycleState::Open => Ok(()),
        }
    }

    /// `Open → Closed`. Returns whether the state changed.
    ///
    /// Closing a closed, removed or disposed handle is a no-op.
    pub fn close(&mut self) -> bool {
        if self.state != LifecycleState::Open {
            return false;
        }
        self.transition(LifecycleState::Closed);
        true
    }

    /// `any → Disposed`. Returns whether the state changed.
    pub fn dispose(&mut self) -> bool {
        if self.state == LifecycleState::Disposed {
            return false;
        }
        self.transition(LifecycleState::Disposed);
        true
    }

    /// `Open → Removed`, after the caller has deleted the store.
    ///
    /// # Errors
    ///
    /// Fails like [`check()`](Lifecycle::check) if the handle is not open
    /// or the store is already gone.
    pub fn mark_removed(&mut self, store_removed: bool) -> Result<(), IsoError> {
        self.check(store_removed)?;
        self.transition(LifecycleState::Removed);
        Ok(())
    }

    fn transition(&mut self, to: LifecycleState) {
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            at: Utc::now(),
        });
        self.state = to;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
