//! Bridge runtime errors.

use crossbind_api::ContextKind;
use thiserror::Error;

use crate::channel::ChannelError;
use crate::handle::HandleState;
use crate::value::Handle;

/// A failure in the bridge runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A struct, enum, or reference type was marshalled without a
    /// prior registration. Never silently downgraded to null.
    #[error("type `{0}` is not registered for marshalling")]
    UnregisteredType(String),

    /// An instance operation hit a handle outside the Live state.
    #[error("handle {handle} is {state}, operation requires a live handle")]
    HandleState {
        /// The offending handle.
        handle: Handle,
        /// Its current lifecycle state.
        state: HandleState,
    },

    /// The native side reported a failure; message carried verbatim.
    #[error("native invocation failed: {0}")]
    NativeInvocation(String),

    /// An implicit context argument was required but no current value
    /// is available. Never silently defaulted.
    #[error("no current {0:?} context available")]
    ContextUnavailable(ContextKind),
}

impl From<ChannelError> for BridgeError {
    fn from(error: ChannelError) -> Self {
        Self::NativeInvocation(error.message().to_string())
    }
}
