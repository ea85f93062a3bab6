//! The scripted native host.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use crossbind_bridge::{
    ChannelError, EventDispatcher, Handle, NativeChannel, Token, TypeRegistry, WireValue,
    dispatch_key,
};
use tracing::debug;

use crate::{TEST_ENUM, TEST_EVENTS, TEST_METHODS, TEST_STRUCT};

/// One native verb the host served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// The verb name, matching the `NativeChannel` method.
    pub verb: &'static str,
    /// Target description: type name or handle plus member.
    pub detail: String,
}

/// A registry pre-populated with the scripted test types.
#[must_use]
pub fn test_registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    registry.register_reference(TEST_METHODS);
    registry.register_reference(TEST_EVENTS);
    registry.register_struct(TEST_STRUCT);
    registry.register_enum(
        TEST_ENUM,
        [("Zero".to_string(), 0), ("One".to_string(), 1), ("Two".to_string(), 2)],
    );
    Arc::new(registry)
}

#[derive(Debug)]
struct Instance {
    type_name: String,
    properties: BTreeMap<String, WireValue>,
}

#[derive(Debug, Default)]
struct Space {
    instances: HashMap<Handle, Instance>,
    static_properties: HashMap<(String, String), WireValue>,
    /// Issued subscription tokens per (target description, event).
    subscriptions: HashMap<(String, String), Vec<Token>>,
}

/// In-memory native host with scripted `com.example.test` behaviors.
#[derive(Default)]
pub struct TestHost {
    space: Mutex<Space>,
    calls: Mutex<Vec<CallRecord>>,
    next_handle: AtomicU64,
    next_token: AtomicU64,
    dispatcher: Mutex<Option<Arc<EventDispatcher>>>,
}

impl TestHost {
    /// A host with an empty object space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the bridge's dispatcher in, so raised events reach
    /// registered listeners.
    pub fn bind_dispatcher(&self, dispatcher: Arc<EventDispatcher>) {
        *lock(&self.dispatcher) = Some(dispatcher);
    }

    /// Every verb served so far, in order.
    pub fn calls(&self) -> Vec<CallRecord> {
        lock(&self.calls).clone()
    }

    /// How many times a verb was served.
    pub fn call_count(&self, verb: &str) -> usize {
        lock(&self.calls).iter().filter(|record| record.verb == verb).count()
    }

    /// Raise a static event to every subscribed listener.
    pub fn raise_static_event(&self, type_name: &str, event: &str, payload: WireValue) {
        self.raise(format!("static:{type_name}"), event, payload);
    }

    /// Raise an instance event to every subscribed listener.
    pub fn raise_event(&self, handle: Handle, event: &str, payload: WireValue) {
        self.raise(format!("instance:{handle}"), event, payload);
    }

    fn raise(&self, target: String, event: &str, payload: WireValue) {
        let tokens = {
            let space = lock(&self.space);
            space.subscriptions.get(&(target, event.to_string())).cloned().unwrap_or_default()
        };
        let dispatcher = lock(&self.dispatcher).clone();
        let Some(dispatcher) = dispatcher else {
            return;
        };
        for token in tokens {
            dispatcher.raise(&dispatch_key(event, &token), payload.clone());
        }
    }

    fn record(&self, verb: &'static str, detail: String) {
        debug!(verb, %detail, "native call");
        lock(&self.calls).push(CallRecord { verb, detail });
    }

    fn issue_token(&self, target: String, event: &str) -> Token {
        let token = Token::new(format!("token-{}", self.next_token.fetch_add(1, Ordering::Relaxed) + 1));
        let mut space = lock(&self.space);
        space
            .subscriptions
            .entry((target, event.to_string()))
            .or_default()
            .push(token.clone());
        token
    }

    fn drop_token(&self, target: String, event: &str, token: &Token) -> Result<(), ChannelError> {
        let mut space = lock(&self.space);
        let Some(tokens) = space.subscriptions.get_mut(&(target, event.to_string())) else {
            return Err(ChannelError::new(format!("no subscription for event {event}")));
        };
        let before = tokens.len();
        tokens.retain(|t| t != token);
        if tokens.len() == before {
            return Err(ChannelError::new(format!("unknown token {token} for event {event}")));
        }
        Ok(())
    }

    /// The scripted method behaviors, shared by the static and
    /// instance invoke verbs.
    fn run_method(
        &self,
        type_name: &str,
        method: &str,
        args: Vec<WireValue>,
    ) -> Result<WireValue, ChannelError> {
        let mut args = args.into_iter();
        match method {
            // echo(text, fail): returns the text, or the scripted
            // failure carrying it.
            "echo" => {
                let text = match args.next() {
                    Some(WireValue::Str(text)) => text,
                    other => {
                        return Err(ChannelError::new(format!(
                            "echo expects a string, got {other:?}"
                        )));
                    },
                };
                if matches!(args.next(), Some(WireValue::Bool(true))) {
                    Err(ChannelError::new(format!("Failed to echo: {text}")))
                } else {
                    Ok(WireValue::Str(text))
                }
            },
            // echoData(data): field-value pass-through.
            "echoData" => match args.next() {
                Some(value @ WireValue::Record { .. }) => Ok(value),
                other => Err(ChannelError::new(format!("echoData expects a record, got {other:?}"))),
            },
            // echoSequence(items): element-wise pass-through.
            "echoSequence" => match args.next() {
                Some(value @ WireValue::List(_)) => Ok(value),
                other => {
                    Err(ChannelError::new(format!("echoSequence expects a list, got {other:?}")))
                },
            },
            other => Err(ChannelError::new(format!("unknown method {type_name}.{other}"))),
        }
    }

    fn with_instance<T>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut Instance) -> Result<T, ChannelError>,
    ) -> Result<T, ChannelError> {
        let mut space = lock(&self.space);
        match space.instances.get_mut(&handle) {
            Some(instance) => f(instance),
            None => Err(ChannelError::new(format!("no such instance {handle}"))),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl NativeChannel for TestHost {
    async fn get_static_property(
        &self,
        type_name: &str,
        property: &str,
    ) -> Result<WireValue, ChannelError> {
        self.record("get_static_property", format!("{type_name}.{property}"));
        let space = lock(&self.space);
        Ok(space
            .static_properties
            .get(&(type_name.to_string(), property.to_string()))
            .cloned()
            .unwrap_or(WireValue::Null))
    }

    async fn set_static_property(
        &self,
        type_name: &str,
        property: &str,
        value: WireValue,
    ) -> Result<(), ChannelError> {
        self.record("set_static_property", format!("{type_name}.{property}"));
        let mut space = lock(&self.space);
        space
            .static_properties
            .insert((type_name.to_string(), property.to_string()), value);
        Ok(())
    }

    async fn invoke_static_method(
        &self,
        type_name: &str,
        method: &str,
        args: Vec<WireValue>,
    ) -> Result<WireValue, ChannelError> {
        self.record("invoke_static_method", format!("{type_name}.{method}"));
        self.run_method(type_name, method, args)
    }

    async fn add_static_event_listener(
        &self,
        type_name: &str,
        event: &str,
    ) -> Result<Token, ChannelError> {
        self.record("add_static_event_listener", format!("{type_name}.{event}"));
        Ok(self.issue_token(format!("static:{type_name}"), event))
    }

    async fn remove_static_event_listener(
        &self,
        type_name: &str,
        event: &str,
        token: &Token,
    ) -> Result<(), ChannelError> {
        self.record("remove_static_event_listener", format!("{type_name}.{event}"));
        self.drop_token(format!("static:{type_name}"), event, token)
    }

    async fn create_instance(
        &self,
        type_name: &str,
        args: Vec<WireValue>,
    ) -> Result<Handle, ChannelError> {
        self.record("create_instance", type_name.to_string());
        let handle = Handle::new(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let mut properties = BTreeMap::new();
        // Constructor arguments become initial property state; the
        // scripted types take at most one `value` argument.
        if let Some(first) = args.into_iter().next() {
            properties.insert("value".to_string(), first);
        }
        let mut space = lock(&self.space);
        space
            .instances
            .insert(handle, Instance { type_name: type_name.to_string(), properties });
        Ok(handle)
    }

    async fn release_instance(&self, handle: Handle) -> Result<(), ChannelError> {
        self.record("release_instance", handle.to_string());
        let mut space = lock(&self.space);
        match space.instances.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(ChannelError::new(format!("no such instance {handle}"))),
        }
    }

    async fn get_property(
        &self,
        handle: Handle,
        property: &str,
    ) -> Result<WireValue, ChannelError> {
        self.record("get_property", format!("{handle}.{property}"));
        self.with_instance(handle, |instance| {
            Ok(instance.properties.get(property).cloned().unwrap_or(WireValue::Null))
        })
    }

    async fn set_property(
        &self,
        handle: Handle,
        property: &str,
        value: WireValue,
    ) -> Result<(), ChannelError> {
        self.record("set_property", format!("{handle}.{property}"));
        self.with_instance(handle, |instance| {
            instance.properties.insert(property.to_string(), value);
            Ok(())
        })
    }

    async fn invoke_method(
        &self,
        handle: Handle,
        method: &str,
        args: Vec<WireValue>,
    ) -> Result<WireValue, ChannelError> {
        self.record("invoke_method", format!("{handle}.{method}"));
        let type_name = self.with_instance(handle, |instance| Ok(instance.type_name.clone()))?;
        self.run_method(&type_name, method, args)
    }

    async fn add_event_listener(
        &self,
        handle: Handle,
        event: &str,
    ) -> Result<Token, ChannelError> {
        self.record("add_event_listener", format!("{handle}.{event}"));
        self.with_instance(handle, |_| Ok(()))?;
        Ok(self.issue_token(format!("instance:{handle}"), event))
    }

    async fn remove_event_listener(
        &self,
        handle: Handle,
        event: &str,
        token: &Token,
    ) -> Result<(), ChannelError> {
        self.record("remove_event_listener", format!("{handle}.{event}"));
        self.drop_token(format!("instance:{handle}"), event, token)
    }
}

impl std::fmt::Debug for TestHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHost").field("calls", &lock(&self.calls).len()).finish_non_exhaustive()
    }
}
