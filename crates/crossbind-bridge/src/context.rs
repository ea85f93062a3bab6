//! Implicit platform context injection.
//!
//! Some native APIs take a leading platform object the fragment marks
//! as implicit (the Android application or the current window). The
//! client never passes it; the bridge prepends the current value from
//! the provider, which lifecycle callbacks keep up to date.

use std::sync::RwLock;

use crossbind_api::ContextKind;

use crate::error::BridgeError;
use crate::value::Value;

/// Process-wide current application and window slots.
#[derive(Debug, Default)]
pub struct ContextProvider {
    application: RwLock<Option<Value>>,
    window: RwLock<Option<Value>>,
}

impl ContextProvider {
    /// A provider with no current context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the current application context, `None` to clear.
    pub fn set_application(&self, value: Option<Value>) {
        let mut slot = match self.application.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = value;
    }

    /// Update the current window context, `None` to clear.
    pub fn set_window(&self, value: Option<Value>) {
        let mut slot = match self.window.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = value;
    }

    /// Snapshot of the current value for a context kind.
    pub fn current(&self, kind: ContextKind) -> Option<Value> {
        let slot = match kind {
            ContextKind::None => return None,
            ContextKind::Application => &self.application,
            ContextKind::Window => &self.window,
        };
        let guard = match slot.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }
}

/// Prepend the current context value as the true leading argument.
///
/// `ContextKind::None` leaves the arguments untouched. A required kind
/// with no current value is [`BridgeError::ContextUnavailable`], never
/// a silent default.
pub fn inject_context(
    kind: ContextKind,
    provider: &ContextProvider,
    args: &mut Vec<Value>,
) -> Result<(), BridgeError> {
    if kind == ContextKind::None {
        return Ok(());
    }
    match provider.current(kind) {
        Some(value) => {
            args.insert(0, value);
            Ok(())
        },
        None => Err(BridgeError::ContextUnavailable(kind)),
    }
}
