//! The native channel abstraction.
//!
//! Everything a client can do against a plugin reduces to these
//! twelve verbs. Production hosts adapt a platform message bus or FFI
//! surface behind this trait; tests use the in-memory harness host.

use async_trait::async_trait;
use thiserror::Error;

use crate::value::{Handle, Token, WireValue};

/// A failure reported by the native side, message carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ChannelError(String);

impl ChannelError {
    /// Wrap a native failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The native message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// The primitive verbs a native host must implement.
///
/// All verbs are async and object-safe; the bridge holds the host as
/// a trait object. Static verbs key on the qualified type name,
/// instance verbs on a handle previously returned by
/// [`create_instance`](Self::create_instance).
#[async_trait]
pub trait NativeChannel: Send + Sync {
    /// Read a static property.
    async fn get_static_property(
        &self,
        type_name: &str,
        property: &str,
    ) -> Result<WireValue, ChannelError>;

    /// Write a static property.
    async fn set_static_property(
        &self,
        type_name: &str,
        property: &str,
        value: WireValue,
    ) -> Result<(), ChannelError>;

    /// Invoke a static method.
    async fn invoke_static_method(
        &self,
        type_name: &str,
        method: &str,
        args: Vec<WireValue>,
    ) -> Result<WireValue, ChannelError>;

    /// Subscribe to a static event, returning the removal token.
    async fn add_static_event_listener(
        &self,
        type_name: &str,
        event: &str,
    ) -> Result<Token, ChannelError>;

    /// Remove a static event subscription.
    async fn remove_static_event_listener(
        &self,
        type_name: &str,
        event: &str,
        token: &Token,
    ) -> Result<(), ChannelError>;

    /// Construct a native instance, returning its handle.
    async fn create_instance(
        &self,
        type_name: &str,
        args: Vec<WireValue>,
    ) -> Result<Handle, ChannelError>;

    /// Release a native instance.
    async fn release_instance(&self, handle: Handle) -> Result<(), ChannelError>;

    /// Read an instance property.
    async fn get_property(
        &self,
        handle: Handle,
        property: &str,
    ) -> Result<WireValue, ChannelError>;

    /// Write an instance property.
    async fn set_property(
        &self,
        handle: Handle,
        property: &str,
        value: WireValue,
    ) -> Result<(), ChannelError>;

    /// Invoke an instance method.
    async fn invoke_method(
        &self,
        handle: Handle,
        method: &str,
        args: Vec<WireValue>,
    ) -> Result<WireValue, ChannelError>;

    /// Subscribe to an instance event, returning the removal token.
    async fn add_event_listener(
        &self,
        handle: Handle,
        event: &str,
    ) -> Result<Token, ChannelError>;

    /// Remove an instance event subscription.
    async fn remove_event_listener(
        &self,
        handle: Handle,
        event: &str,
        token: &Token,
    ) -> Result<(), ChannelError>;
}
