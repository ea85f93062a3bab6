//! Native handle lifecycle tracking.
//!
//! Handles move `Unallocated -> Live -> Released` and never back. The
//! table stores only handles it has seen; anything unknown is
//! Unallocated. Release is exactly-once: a second release is an error
//! surfaced to the caller, not suppressed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::error::BridgeError;
use crate::value::Handle;

/// Lifecycle state of a native handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Never returned by `create_instance` on this bridge.
    Unallocated,
    /// Backed by a live native object.
    Live,
    /// Released; the native object is gone.
    Released,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unallocated => "unallocated",
            Self::Live => "live",
            Self::Released => "released",
        })
    }
}

/// Tracks every handle the bridge has allocated.
#[derive(Debug, Default)]
pub struct HandleTable {
    states: Mutex<HashMap<Handle, HandleState>>,
}

impl HandleTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a handle.
    pub fn state(&self, handle: Handle) -> HandleState {
        let states = match self.states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        states.get(&handle).copied().unwrap_or(HandleState::Unallocated)
    }

    /// Mark a handle returned by `create_instance` as live.
    pub fn register(&self, handle: Handle) {
        let mut states = match self.states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        states.insert(handle, HandleState::Live);
    }

    /// Check that a handle is live, for instance operations.
    pub fn ensure_live(&self, handle: Handle) -> Result<(), BridgeError> {
        match self.state(handle) {
            HandleState::Live => Ok(()),
            state => Err(BridgeError::HandleState { handle, state }),
        }
    }

    /// Transition a live handle to released. Fails on any other state,
    /// surfacing double-release as an error.
    pub fn release(&self, handle: Handle) -> Result<(), BridgeError> {
        let mut states = match self.states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        match states.get(&handle).copied().unwrap_or(HandleState::Unallocated) {
            HandleState::Live => {
                states.insert(handle, HandleState::Released);
                Ok(())
            },
            state => Err(BridgeError::HandleState { handle, state }),
        }
    }
}
