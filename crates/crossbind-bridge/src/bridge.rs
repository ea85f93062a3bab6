//! The bridge facade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::channel::NativeChannel;
use crate::context::ContextProvider;
use crate::error::BridgeError;
use crate::events::{
    DispatchCallback, EventDispatcher, EventRegistry, EventTarget, Listener, ListenerId,
    Registration, dispatch_key,
};
use crate::handle::HandleTable;
use crate::marshal::{from_wire, to_wire};
use crate::registry::TypeRegistry;
use crate::value::{ObjectRef, Value, WireValue};

/// Client entry point over one native channel.
///
/// Static operations key on the qualified type name, instance
/// operations on a live handle. Every operation is async and
/// non-blocking; shared state is mutated only between await points.
pub struct Bridge {
    channel: Arc<dyn NativeChannel>,
    registry: Arc<TypeRegistry>,
    handles: HandleTable,
    events: Mutex<EventRegistry>,
    dispatcher: Arc<EventDispatcher>,
    context: Arc<ContextProvider>,
    next_listener: AtomicU64,
}

impl Bridge {
    /// A bridge over `channel`, marshalling through `registry`.
    #[must_use]
    pub fn new(channel: Arc<dyn NativeChannel>, registry: Arc<TypeRegistry>) -> Self {
        Self {
            channel,
            registry,
            handles: HandleTable::new(),
            events: Mutex::new(EventRegistry::default()),
            dispatcher: Arc::new(EventDispatcher::new()),
            context: Arc::new(ContextProvider::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// The dispatcher the native host raises events through.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<EventDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// The context provider lifecycle callbacks update.
    #[must_use]
    pub fn context(&self) -> Arc<ContextProvider> {
        Arc::clone(&self.context)
    }

    /// The marshalling registry.
    #[must_use]
    pub fn registry(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.registry)
    }

    /// Lifecycle state of a handle, mainly for diagnostics and tests.
    #[must_use]
    pub fn handle_state(&self, object: &ObjectRef) -> crate::handle::HandleState {
        self.handles.state(object.handle)
    }

    /// A fresh monotonic listener id.
    pub fn next_listener_id(&self) -> ListenerId {
        ListenerId::new(self.next_listener.fetch_add(1, Ordering::Relaxed))
    }

    fn marshal_args(&self, args: Vec<Value>) -> Result<Vec<WireValue>, BridgeError> {
        args.iter().map(|arg| to_wire(arg, &self.registry)).collect()
    }

    /// Read a static property.
    pub async fn get_static_property(
        &self,
        type_name: &str,
        property: &str,
    ) -> Result<Value, BridgeError> {
        let wire = self.channel.get_static_property(type_name, property).await?;
        from_wire(wire, &self.registry)
    }

    /// Write a static property.
    pub async fn set_static_property(
        &self,
        type_name: &str,
        property: &str,
        value: Value,
    ) -> Result<(), BridgeError> {
        let wire = to_wire(&value, &self.registry)?;
        self.channel.set_static_property(type_name, property, wire).await?;
        Ok(())
    }

    /// Invoke a static method.
    pub async fn invoke_static_method(
        &self,
        type_name: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        let wire_args = self.marshal_args(args)?;
        let wire = self.channel.invoke_static_method(type_name, method, wire_args).await?;
        from_wire(wire, &self.registry)
    }

    /// Construct a native instance and track its handle as live.
    pub async fn create_instance(
        &self,
        type_name: &str,
        args: Vec<Value>,
    ) -> Result<ObjectRef, BridgeError> {
        let wire_args = self.marshal_args(args)?;
        let handle = self.channel.create_instance(type_name, wire_args).await?;
        self.handles.register(handle);
        debug!(type_name, %handle, "instance created");
        Ok(ObjectRef::new(type_name, handle))
    }

    /// Release a native instance, exactly once.
    ///
    /// The handle is retired before the native call, so a release
    /// issued while another is in flight rejects instead of reaching
    /// native twice. Local subscriptions on the instance are dropped
    /// with it; their dispatcher bindings are cancelled without native
    /// removal calls, since the native object is gone.
    pub async fn release_instance(&self, object: &ObjectRef) -> Result<(), BridgeError> {
        self.handles.release(object.handle)?;
        self.channel.release_instance(object.handle).await?;

        let registrations = {
            let mut events = lock_events(&self.events);
            events.remove_target(&EventTarget::Instance(object.handle))
        };
        for registration in registrations {
            self.dispatcher.cancel(&registration.dispatch_key);
        }
        debug!(handle = %object.handle, "instance released");
        Ok(())
    }

    /// Read an instance property.
    pub async fn get_property(
        &self,
        object: &ObjectRef,
        property: &str,
    ) -> Result<Value, BridgeError> {
        self.handles.ensure_live(object.handle)?;
        let wire = self.channel.get_property(object.handle, property).await?;
        from_wire(wire, &self.registry)
    }

    /// Write an instance property.
    pub async fn set_property(
        &self,
        object: &ObjectRef,
        property: &str,
        value: Value,
    ) -> Result<(), BridgeError> {
        self.handles.ensure_live(object.handle)?;
        let wire = to_wire(&value, &self.registry)?;
        self.channel.set_property(object.handle, property, wire).await?;
        Ok(())
    }

    /// Invoke an instance method.
    pub async fn invoke_method(
        &self,
        object: &ObjectRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        self.handles.ensure_live(object.handle)?;
        let wire_args = self.marshal_args(args)?;
        let wire = self.channel.invoke_method(object.handle, method, wire_args).await?;
        from_wire(wire, &self.registry)
    }

    /// Subscribe a listener to a static event.
    ///
    /// The triple is claimed before the native call, so an already
    /// subscribed or concurrently subscribing triple resolves without
    /// any native call.
    pub async fn add_static_event_listener(
        &self,
        type_name: &str,
        event: &str,
        listener: &Listener,
    ) -> Result<(), BridgeError> {
        let target = EventTarget::Static(type_name.to_string());
        if !self.claim_subscription(&target, event, listener.id) {
            return Ok(());
        }
        let token = match self.channel.add_static_event_listener(type_name, event).await {
            Ok(token) => token,
            Err(error) => {
                self.abandon_subscription(&target, event, listener.id);
                return Err(error.into());
            },
        };
        self.finish_subscription(target, event, listener, token);
        Ok(())
    }

    /// Remove a static event subscription; an absent triple is a no-op
    /// with zero native calls.
    pub async fn remove_static_event_listener(
        &self,
        type_name: &str,
        event: &str,
        id: ListenerId,
    ) -> Result<(), BridgeError> {
        let target = EventTarget::Static(type_name.to_string());
        let Some(registration) = self.take_subscription(&target, event, id) else {
            return Ok(());
        };
        self.channel
            .remove_static_event_listener(type_name, event, &registration.token)
            .await?;
        self.dispatcher.cancel(&registration.dispatch_key);
        Ok(())
    }

    /// Subscribe a listener to an instance event.
    pub async fn add_event_listener(
        &self,
        object: &ObjectRef,
        event: &str,
        listener: &Listener,
    ) -> Result<(), BridgeError> {
        self.handles.ensure_live(object.handle)?;
        let target = EventTarget::Instance(object.handle);
        if !self.claim_subscription(&target, event, listener.id) {
            return Ok(());
        }
        let token = match self.channel.add_event_listener(object.handle, event).await {
            Ok(token) => token,
            Err(error) => {
                self.abandon_subscription(&target, event, listener.id);
                return Err(error.into());
            },
        };
        self.finish_subscription(target, event, listener, token);
        Ok(())
    }

    /// Remove an instance event subscription; an absent triple is a
    /// no-op with zero native calls.
    pub async fn remove_event_listener(
        &self,
        object: &ObjectRef,
        event: &str,
        id: ListenerId,
    ) -> Result<(), BridgeError> {
        let target = EventTarget::Instance(object.handle);
        let Some(registration) = self.take_subscription(&target, event, id) else {
            return Ok(());
        };
        self.channel
            .remove_event_listener(object.handle, event, &registration.token)
            .await?;
        self.dispatcher.cancel(&registration.dispatch_key);
        Ok(())
    }

    fn claim_subscription(&self, target: &EventTarget, event: &str, id: ListenerId) -> bool {
        lock_events(&self.events).begin(target, event, id)
    }

    fn abandon_subscription(&self, target: &EventTarget, event: &str, id: ListenerId) {
        lock_events(&self.events).abandon(target, event, id);
    }

    fn take_subscription(
        &self,
        target: &EventTarget,
        event: &str,
        id: ListenerId,
    ) -> Option<Registration> {
        lock_events(&self.events).remove(target, event, id)
    }

    fn finish_subscription(
        &self,
        target: EventTarget,
        event: &str,
        listener: &Listener,
        token: crate::value::Token,
    ) {
        let key = dispatch_key(event, &token);
        let callback = Arc::clone(&listener.callback);
        let registry = Arc::clone(&self.registry);
        let event_name = event.to_string();
        let wrapped: DispatchCallback = Arc::new(move |payload: WireValue| {
            match from_wire(payload, &registry) {
                Ok(value) => callback(value),
                Err(error) => warn!(event = %event_name, %error, "dropping undecodable event payload"),
            }
        });
        self.dispatcher.bind(key.clone(), wrapped);
        debug!(event, %token, listener = %listener.id, "event listener registered");
        lock_events(&self.events).activate(
            target,
            event.to_string(),
            listener.id,
            Registration { token, dispatch_key: key },
        );
    }
}

fn lock_events(events: &Mutex<EventRegistry>) -> std::sync::MutexGuard<'_, EventRegistry> {
    match events.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").field("dispatcher", &self.dispatcher).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicU64;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::channel::ChannelError;
    use crate::handle::HandleState;
    use crate::value::{Handle, Token};

    /// Minimal channel that logs verbs and issues sequential handles
    /// and tokens.
    #[derive(Default)]
    struct StubChannel {
        log: StdMutex<Vec<String>>,
        next_handle: AtomicU64,
        next_token: AtomicU64,
    }

    impl StubChannel {
        fn log(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NativeChannel for StubChannel {
        async fn get_static_property(
            &self,
            type_name: &str,
            property: &str,
        ) -> Result<WireValue, ChannelError> {
            self.log(format!("get_static {type_name}.{property}"));
            Ok(WireValue::Str("static".to_string()))
        }

        async fn set_static_property(
            &self,
            type_name: &str,
            property: &str,
            _value: WireValue,
        ) -> Result<(), ChannelError> {
            self.log(format!("set_static {type_name}.{property}"));
            Ok(())
        }

        async fn invoke_static_method(
            &self,
            type_name: &str,
            method: &str,
            mut args: Vec<WireValue>,
        ) -> Result<WireValue, ChannelError> {
            self.log(format!("invoke_static {type_name}.{method}"));
            Ok(args.drain(..).next().unwrap_or(WireValue::Null))
        }

        async fn add_static_event_listener(
            &self,
            type_name: &str,
            event: &str,
        ) -> Result<Token, ChannelError> {
            self.log(format!("add_static_listener {type_name}.{event}"));
            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            Ok(Token::new(format!("tok-{token}")))
        }

        async fn remove_static_event_listener(
            &self,
            type_name: &str,
            event: &str,
            _token: &Token,
        ) -> Result<(), ChannelError> {
            self.log(format!("remove_static_listener {type_name}.{event}"));
            Ok(())
        }

        async fn create_instance(
            &self,
            type_name: &str,
            _args: Vec<WireValue>,
        ) -> Result<Handle, ChannelError> {
            self.log(format!("create {type_name}"));
            Ok(Handle::new(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1))
        }

        async fn release_instance(&self, handle: Handle) -> Result<(), ChannelError> {
            self.log(format!("release {handle}"));
            Ok(())
        }

        async fn get_property(
            &self,
            handle: Handle,
            property: &str,
        ) -> Result<WireValue, ChannelError> {
            self.log(format!("get {handle}.{property}"));
            Ok(WireValue::Null)
        }

        async fn set_property(
            &self,
            handle: Handle,
            property: &str,
            _value: WireValue,
        ) -> Result<(), ChannelError> {
            self.log(format!("set {handle}.{property}"));
            Ok(())
        }

        async fn invoke_method(
            &self,
            handle: Handle,
            method: &str,
            _args: Vec<WireValue>,
        ) -> Result<WireValue, ChannelError> {
            self.log(format!("invoke {handle}.{method}"));
            Ok(WireValue::Null)
        }

        async fn add_event_listener(
            &self,
            handle: Handle,
            event: &str,
        ) -> Result<Token, ChannelError> {
            self.log(format!("add_listener {handle}.{event}"));
            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            Ok(Token::new(format!("tok-{token}")))
        }

        async fn remove_event_listener(
            &self,
            handle: Handle,
            event: &str,
            _token: &Token,
        ) -> Result<(), ChannelError> {
            self.log(format!("remove_listener {handle}.{event}"));
            Ok(())
        }
    }

    fn bridge_over_stub() -> (Bridge, Arc<StubChannel>) {
        let channel = Arc::new(StubChannel::default());
        let registry = Arc::new(TypeRegistry::new());
        registry.register_reference("com.example.test.TestMethods");
        (Bridge::new(Arc::clone(&channel) as Arc<dyn NativeChannel>, registry), channel)
    }

    #[tokio::test]
    async fn instance_ops_require_live_handle() {
        let (bridge, _) = bridge_over_stub();
        let object = bridge
            .create_instance("com.example.test.TestMethods", Vec::new())
            .await
            .unwrap();
        assert_eq!(bridge.handle_state(&object), HandleState::Live);

        bridge.invoke_method(&object, "ping", Vec::new()).await.unwrap();
        bridge.release_instance(&object).await.unwrap();
        assert_eq!(bridge.handle_state(&object), HandleState::Released);

        let err = bridge.invoke_method(&object, "ping", Vec::new()).await.unwrap_err();
        assert!(matches!(err, BridgeError::HandleState { state: HandleState::Released, .. }));
    }

    #[tokio::test]
    async fn double_subscribe_costs_one_native_call() {
        let (bridge, channel) = bridge_over_stub();
        let object = bridge
            .create_instance("com.example.test.TestMethods", Vec::new())
            .await
            .unwrap();

        let listener = Listener::new(bridge.next_listener_id(), |_value| {});
        bridge.add_event_listener(&object, "Changed", &listener).await.unwrap();
        bridge.add_event_listener(&object, "Changed", &listener).await.unwrap();

        let adds = channel
            .entries()
            .iter()
            .filter(|entry| entry.starts_with("add_listener"))
            .count();
        assert_eq!(adds, 1);
        assert_eq!(bridge.dispatcher().binding_count(), 1);
    }

    #[tokio::test]
    async fn remove_of_absent_listener_is_a_silent_no_op() {
        let (bridge, channel) = bridge_over_stub();
        let object = bridge
            .create_instance("com.example.test.TestMethods", Vec::new())
            .await
            .unwrap();

        bridge
            .remove_event_listener(&object, "Changed", ListenerId::new(99))
            .await
            .unwrap();
        let removes = channel
            .entries()
            .iter()
            .filter(|entry| entry.starts_with("remove_listener"))
            .count();
        assert_eq!(removes, 0);
    }

    #[tokio::test]
    async fn distinct_listener_ids_subscribe_separately() {
        let (bridge, _channel) = bridge_over_stub();
        let object = bridge
            .create_instance("com.example.test.TestMethods", Vec::new())
            .await
            .unwrap();

        let first = Listener::new(bridge.next_listener_id(), |_value| {});
        let second = Listener::new(bridge.next_listener_id(), |_value| {});
        assert_ne!(first.id, second.id);

        bridge.add_event_listener(&object, "Changed", &first).await.unwrap();
        bridge.add_event_listener(&object, "Changed", &second).await.unwrap();
        assert_eq!(bridge.dispatcher().binding_count(), 2);
    }

    #[tokio::test]
    async fn release_cancels_local_bindings_without_native_removes() {
        let (bridge, channel) = bridge_over_stub();
        let object = bridge
            .create_instance("com.example.test.TestMethods", Vec::new())
            .await
            .unwrap();
        let listener = Listener::new(bridge.next_listener_id(), |_value| {});
        bridge.add_event_listener(&object, "Changed", &listener).await.unwrap();

        bridge.release_instance(&object).await.unwrap();
        assert_eq!(bridge.dispatcher().binding_count(), 0);
        let removes = channel
            .entries()
            .iter()
            .filter(|entry| entry.starts_with("remove_listener"))
            .count();
        assert_eq!(removes, 0);
    }

    /// Channel that parks the add and release verbs on a gate,
    /// exposing the await point in the middle of those operations.
    struct GatedChannel {
        gate: Semaphore,
        adds: AtomicU64,
        releases: AtomicU64,
        next_token: AtomicU64,
    }

    impl GatedChannel {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                adds: AtomicU64::new(0),
                releases: AtomicU64::new(0),
                next_token: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl NativeChannel for GatedChannel {
        async fn get_static_property(
            &self,
            _type_name: &str,
            _property: &str,
        ) -> Result<WireValue, ChannelError> {
            panic!("not exercised")
        }

        async fn set_static_property(
            &self,
            _type_name: &str,
            _property: &str,
            _value: WireValue,
        ) -> Result<(), ChannelError> {
            panic!("not exercised")
        }

        async fn invoke_static_method(
            &self,
            _type_name: &str,
            _method: &str,
            _args: Vec<WireValue>,
        ) -> Result<WireValue, ChannelError> {
            panic!("not exercised")
        }

        async fn add_static_event_listener(
            &self,
            _type_name: &str,
            _event: &str,
        ) -> Result<Token, ChannelError> {
            panic!("not exercised")
        }

        async fn remove_static_event_listener(
            &self,
            _type_name: &str,
            _event: &str,
            _token: &Token,
        ) -> Result<(), ChannelError> {
            panic!("not exercised")
        }

        async fn create_instance(
            &self,
            _type_name: &str,
            _args: Vec<WireValue>,
        ) -> Result<Handle, ChannelError> {
            Ok(Handle::new(1))
        }

        async fn release_instance(&self, _handle: Handle) -> Result<(), ChannelError> {
            self.releases.fetch_add(1, Ordering::Relaxed);
            let _permit = self.gate.acquire().await.expect("gate open");
            Ok(())
        }

        async fn get_property(
            &self,
            _handle: Handle,
            _property: &str,
        ) -> Result<WireValue, ChannelError> {
            panic!("not exercised")
        }

        async fn set_property(
            &self,
            _handle: Handle,
            _property: &str,
            _value: WireValue,
        ) -> Result<(), ChannelError> {
            panic!("not exercised")
        }

        async fn invoke_method(
            &self,
            _handle: Handle,
            _method: &str,
            _args: Vec<WireValue>,
        ) -> Result<WireValue, ChannelError> {
            panic!("not exercised")
        }

        async fn add_event_listener(
            &self,
            _handle: Handle,
            _event: &str,
        ) -> Result<Token, ChannelError> {
            self.adds.fetch_add(1, Ordering::Relaxed);
            let _permit = self.gate.acquire().await.expect("gate open");
            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            Ok(Token::new(format!("tok-{token}")))
        }

        async fn remove_event_listener(
            &self,
            _handle: Handle,
            _event: &str,
            _token: &Token,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn bridge_over_gate() -> (Arc<Bridge>, Arc<GatedChannel>) {
        let channel = Arc::new(GatedChannel::new());
        let registry = Arc::new(TypeRegistry::new());
        registry.register_reference("com.example.test.TestEvents");
        let bridge =
            Arc::new(Bridge::new(Arc::clone(&channel) as Arc<dyn NativeChannel>, registry));
        (bridge, channel)
    }

    #[tokio::test]
    async fn concurrent_adds_for_one_triple_cost_one_native_call() {
        let (bridge, channel) = bridge_over_gate();
        let object = bridge
            .create_instance("com.example.test.TestEvents", Vec::new())
            .await
            .unwrap();
        let listener = Listener::new(bridge.next_listener_id(), |_value| {});

        let in_flight = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            let object = object.clone();
            let listener = listener.clone();
            async move { bridge.add_event_listener(&object, "Changed", &listener).await }
        });
        // Let the first add park on the native call.
        while channel.adds.load(Ordering::Relaxed) == 0 {
            tokio::task::yield_now().await;
        }

        // The triple is already claimed; this resolves locally.
        bridge.add_event_listener(&object, "Changed", &listener).await.unwrap();
        assert_eq!(channel.adds.load(Ordering::Relaxed), 1);

        channel.gate.add_permits(1);
        in_flight.await.unwrap().unwrap();
        assert_eq!(channel.adds.load(Ordering::Relaxed), 1);
        assert_eq!(bridge.dispatcher().binding_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_releases_reach_native_once() {
        let (bridge, channel) = bridge_over_gate();
        let object = bridge
            .create_instance("com.example.test.TestEvents", Vec::new())
            .await
            .unwrap();

        let in_flight = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            let object = object.clone();
            async move { bridge.release_instance(&object).await }
        });
        // Let the first release park on the native call.
        while channel.releases.load(Ordering::Relaxed) == 0 {
            tokio::task::yield_now().await;
        }

        // The handle is already retired; this rejects without a
        // second native call.
        let err = bridge.release_instance(&object).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::HandleState { handle: object.handle, state: HandleState::Released }
        );

        channel.gate.add_permits(1);
        in_flight.await.unwrap().unwrap();
        assert_eq!(channel.releases.load(Ordering::Relaxed), 1);
    }
}
