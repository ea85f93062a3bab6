//! Event subscription bookkeeping and dispatch.
//!
//! Subscriptions are keyed by `(target, event name, listener id)`, so
//! the same callback registered twice for one event costs exactly one
//! native registration, and removing a listener that was never added
//! costs none.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::value::{Handle, Token, Value, WireValue};

/// What a subscription is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// A static event, keyed by qualified type name.
    Static(String),
    /// An instance event, keyed by the live handle.
    Instance(Handle),
}

/// Identity of one registered listener, assigned monotonically by the
/// bridge. Two registrations of the same callback under different ids
/// are distinct subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw id.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// The client callback invoked with each unmarshalled event argument.
pub type EventCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// The raw-payload callback a dispatch key is bound to; the bridge
/// wraps the client callback with unmarshalling.
pub(crate) type DispatchCallback = Arc<dyn Fn(WireValue) + Send + Sync>;

/// An id plus the callback it identifies.
#[derive(Clone)]
pub struct Listener {
    /// The bridge-assigned id.
    pub id: ListenerId,
    /// Invoked with the unmarshalled argument of each raised event.
    pub callback: EventCallback,
}

impl Listener {
    /// Pair an id with a callback.
    pub fn new(id: ListenerId, callback: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self { id, callback: Arc::new(callback) }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish_non_exhaustive()
    }
}

/// The dispatch key the native side raises events under.
#[must_use]
pub fn dispatch_key(event: &str, token: &Token) -> String {
    format!("{event}:{token}")
}

/// One native registration held for a subscription triple.
#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub(crate) token: Token,
    pub(crate) dispatch_key: String,
}

/// State of one subscription triple.
#[derive(Debug)]
enum Subscription {
    /// The triple is claimed; the native registration is in flight.
    Pending,
    /// The native registration completed.
    Active(Registration),
}

/// Subscription triples to their native registrations.
///
/// A triple is claimed before the native add is awaited, so two
/// concurrently issued adds for the same triple still cost exactly one
/// native call.
#[derive(Debug, Default)]
pub(crate) struct EventRegistry {
    entries: HashMap<(EventTarget, String, ListenerId), Subscription>,
}

impl EventRegistry {
    /// Claim a triple ahead of the native add. False when the triple
    /// is already claimed or active, meaning no native call is due.
    pub(crate) fn begin(&mut self, target: &EventTarget, event: &str, id: ListenerId) -> bool {
        let key = (target.clone(), event.to_string(), id);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, Subscription::Pending);
        true
    }

    /// Store the native registration for a claimed triple.
    pub(crate) fn activate(
        &mut self,
        target: EventTarget,
        event: String,
        id: ListenerId,
        registration: Registration,
    ) {
        self.entries.insert((target, event, id), Subscription::Active(registration));
    }

    /// Release a claimed triple after a failed native add.
    pub(crate) fn abandon(&mut self, target: &EventTarget, event: &str, id: ListenerId) {
        self.entries.remove(&(target.clone(), event.to_string(), id));
    }

    /// Take an active registration for removal. A pending triple stays
    /// put; its add has not returned a token to remove yet.
    pub(crate) fn remove(
        &mut self,
        target: &EventTarget,
        event: &str,
        id: ListenerId,
    ) -> Option<Registration> {
        let key = (target.clone(), event.to_string(), id);
        match self.entries.get(&key) {
            Some(Subscription::Active(_)) => match self.entries.remove(&key) {
                Some(Subscription::Active(registration)) => Some(registration),
                _ => None,
            },
            _ => None,
        }
    }

    /// Drop every registration for a target, returning the active ones
    /// so their dispatcher entries can be cancelled. Used on instance
    /// release.
    pub(crate) fn remove_target(&mut self, target: &EventTarget) -> Vec<Registration> {
        let keys: Vec<_> = self
            .entries
            .keys()
            .filter(|(t, _, _)| t == target)
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|key| match self.entries.remove(&key) {
                Some(Subscription::Active(registration)) => Some(registration),
                _ => None,
            })
            .collect()
    }
}

/// Shared map from dispatch key to callback. The native host pushes
/// raised events through [`raise`](Self::raise).
#[derive(Default)]
pub struct EventDispatcher {
    callbacks: Mutex<HashMap<String, DispatchCallback>>,
}

impl EventDispatcher {
    /// An empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a callback under a dispatch key.
    pub(crate) fn bind(&self, key: String, callback: DispatchCallback) {
        let mut callbacks = match self.callbacks.lock() {
            Ok(callbacks) => callbacks,
            Err(poisoned) => poisoned.into_inner(),
        };
        callbacks.insert(key, callback);
    }

    /// Cancel a dispatch key after native removal.
    pub(crate) fn cancel(&self, key: &str) {
        let mut callbacks = match self.callbacks.lock() {
            Ok(callbacks) => callbacks,
            Err(poisoned) => poisoned.into_inner(),
        };
        callbacks.remove(key);
    }

    /// Deliver a raised event. A key with no binding is logged and
    /// dropped; the native side may race a removal.
    pub fn raise(&self, key: &str, payload: WireValue) {
        let callback = {
            let callbacks = match self.callbacks.lock() {
                Ok(callbacks) => callbacks,
                Err(poisoned) => poisoned.into_inner(),
            };
            callbacks.get(key).cloned()
        };
        match callback {
            Some(callback) => callback(payload),
            None => warn!(key, "event raised with no bound listener"),
        }
    }

    /// Number of live dispatch bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        let callbacks = match self.callbacks.lock() {
            Ok(callbacks) => callbacks,
            Err(poisoned) => poisoned.into_inner(),
        };
        callbacks.len()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("bindings", &self.binding_count())
            .finish()
    }
}
