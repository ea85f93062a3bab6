//! Async client-to-native bridge runtime.
//!
//! The bridge reduces every client-visible operation on a plugin API
//! to twelve primitive verbs on a [`NativeChannel`], marshalling
//! values between the client representation ([`Value`]) and the
//! channel representation ([`WireValue`]). It tracks native object
//! handles through an explicit lifecycle, deduplicates event
//! subscriptions, and injects implicit platform context arguments.
//!
//! The bridge adds no retry, timeout, or cancellation: native failures
//! surface as [`BridgeError::NativeInvocation`] with the native
//! message unchanged, and lifecycle misuse surfaces as
//! [`BridgeError::HandleState`] instead of being suppressed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bridge;
mod channel;
mod context;
mod error;
mod events;
mod handle;
mod marshal;
mod registry;
mod value;

pub use bridge::Bridge;
pub use channel::{ChannelError, NativeChannel};
pub use context::{ContextProvider, inject_context};
pub use error::BridgeError;
pub use events::{EventCallback, EventDispatcher, EventTarget, Listener, ListenerId, dispatch_key};
pub use handle::{HandleState, HandleTable};
pub use marshal::{from_wire, to_wire};
pub use registry::{RegisteredType, TypeRegistry};
pub use value::{DATE_RECORD_TYPE, Handle, ObjectRef, Token, Value, WireValue};
