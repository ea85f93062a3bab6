//! End-to-end bridge scenarios over the scripted host.
//!
//! Exercises the full client path through marshalling, the handle
//! table, and event dispatch:
//! - Scripted `com.example.test` method behaviors (echo, echoData,
//!   echoSequence)
//! - Handle lifecycle enforcement
//! - Event subscription dedup and raised-event delivery
//! - Implicit context injection

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crossbind_api::ContextKind;
use crossbind_bridge::{
    Bridge, BridgeError, HandleState, Listener, NativeChannel, Value, WireValue, inject_context,
};
use crossbind_harness::{TEST_EVENTS, TEST_METHODS, TEST_STRUCT, TestHost, test_registry};

/// A bridge wired to a fresh host, with the dispatcher bound so raised
/// events reach listeners.
fn setup() -> (Arc<TestHost>, Bridge) {
    let host = Arc::new(TestHost::new());
    let bridge = Bridge::new(host.clone() as Arc<dyn NativeChannel>, test_registry());
    host.bind_dispatcher(bridge.dispatcher());
    (host, bridge)
}

/// A listener that appends every delivered payload to a shared log.
fn recording_listener(bridge: &Bridge) -> (Listener, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let listener = Listener::new(bridge.next_listener_id(), move |payload| {
        sink.lock().expect("listener log").push(payload);
    });
    (listener, received)
}

fn test_struct(value: Value) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("value".to_string(), value);
    Value::Struct { type_name: TEST_STRUCT.to_string(), fields }
}

#[tokio::test]
async fn echo_round_trips_through_the_host() {
    let (host, bridge) = setup();

    let result = bridge
        .invoke_static_method(TEST_METHODS, "echo", vec![Value::str("test"), Value::Bool(false)])
        .await
        .expect("echo succeeds");

    assert_eq!(result, Value::str("test"));
    assert_eq!(host.call_count("invoke_static_method"), 1);
}

#[tokio::test]
async fn nullable_date_struct_echoes_by_field_value() {
    let (host, bridge) = setup();

    let object = bridge
        .create_instance(TEST_METHODS, Vec::new())
        .await
        .expect("create succeeds");

    let dated = test_struct(Value::Date(1_700_000_000_000));
    let result = bridge
        .invoke_method(&object, "echoData", vec![dated.clone()])
        .await
        .expect("echoData succeeds");
    assert_eq!(result, dated);

    // The absent nullable survives as an explicit null field.
    let empty = test_struct(Value::Null);
    let result = bridge
        .invoke_method(&object, "echoData", vec![empty.clone()])
        .await
        .expect("echoData succeeds");
    assert_eq!(result, empty);
    assert_eq!(host.call_count("invoke_method"), 2);
}

#[tokio::test]
async fn sequence_echoes_element_wise() {
    let (_host, bridge) = setup();

    let items = Value::List(vec![Value::str("a"), Value::Null, Value::str("b")]);
    let result = bridge
        .invoke_static_method(TEST_METHODS, "echoSequence", vec![items.clone()])
        .await
        .expect("echoSequence succeeds");

    assert_eq!(result, items);
}

#[tokio::test]
async fn scripted_failure_surfaces_verbatim() {
    let (_host, bridge) = setup();

    let err = bridge
        .invoke_static_method(TEST_METHODS, "echo", vec![Value::str("test"), Value::Bool(true)])
        .await
        .expect_err("scripted failure");

    match err {
        BridgeError::NativeInvocation(message) => {
            assert!(message.contains("Failed to echo: test"), "message was {message:?}");
        },
        other => panic!("expected a native invocation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn instance_methods_run_against_the_created_object() {
    let (host, bridge) = setup();

    let object = bridge
        .create_instance(TEST_METHODS, vec![Value::str("seed")])
        .await
        .expect("create succeeds");
    assert_eq!(bridge.handle_state(&object), HandleState::Live);

    // The constructor argument became initial property state.
    let value = bridge.get_property(&object, "value").await.expect("get succeeds");
    assert_eq!(value, Value::str("seed"));

    bridge.set_property(&object, "value", Value::Int(7)).await.expect("set succeeds");
    let value = bridge.get_property(&object, "value").await.expect("get succeeds");
    assert_eq!(value, Value::Int(7));

    let echoed = bridge
        .invoke_method(&object, "echo", vec![Value::str("hi"), Value::Bool(false)])
        .await
        .expect("invoke succeeds");
    assert_eq!(echoed, Value::str("hi"));

    assert_eq!(host.call_count("create_instance"), 1);
    assert_eq!(host.call_count("invoke_method"), 1);
}

#[tokio::test]
async fn static_properties_round_trip() {
    let (_host, bridge) = setup();

    bridge
        .set_static_property(TEST_METHODS, "staticProperty", Value::str("set"))
        .await
        .expect("set succeeds");
    let value = bridge
        .get_static_property(TEST_METHODS, "staticProperty")
        .await
        .expect("get succeeds");

    assert_eq!(value, Value::str("set"));
}

#[tokio::test]
async fn double_release_is_rejected() {
    let (host, bridge) = setup();

    let object =
        bridge.create_instance(TEST_METHODS, Vec::new()).await.expect("create succeeds");
    bridge.release_instance(&object).await.expect("first release succeeds");
    assert_eq!(bridge.handle_state(&object), HandleState::Released);

    let err = bridge.release_instance(&object).await.expect_err("second release fails");
    assert_eq!(
        err,
        BridgeError::HandleState { handle: object.handle, state: HandleState::Released }
    );
    // The second release never reached the host.
    assert_eq!(host.call_count("release_instance"), 1);
}

#[tokio::test]
async fn released_instance_rejects_operations() {
    let (host, bridge) = setup();

    let object =
        bridge.create_instance(TEST_METHODS, Vec::new()).await.expect("create succeeds");
    bridge.release_instance(&object).await.expect("release succeeds");

    let err = bridge.get_property(&object, "value").await.expect_err("get fails");
    assert_eq!(
        err,
        BridgeError::HandleState { handle: object.handle, state: HandleState::Released }
    );
    assert_eq!(host.call_count("get_property"), 0);
}

#[tokio::test]
async fn double_subscribe_costs_one_native_call() {
    let (host, bridge) = setup();

    let object =
        bridge.create_instance(TEST_EVENTS, Vec::new()).await.expect("create succeeds");
    let (listener, _received) = recording_listener(&bridge);

    bridge
        .add_event_listener(&object, "InstanceEvent", &listener)
        .await
        .expect("first add succeeds");
    bridge
        .add_event_listener(&object, "InstanceEvent", &listener)
        .await
        .expect("second add is a no-op");

    assert_eq!(host.call_count("add_event_listener"), 1);
}

#[tokio::test]
async fn remove_without_add_makes_no_native_call() {
    let (host, bridge) = setup();

    let (listener, _received) = recording_listener(&bridge);
    bridge
        .remove_static_event_listener(TEST_EVENTS, "StaticEvent", listener.id)
        .await
        .expect("absent removal resolves");

    assert_eq!(host.call_count("remove_static_event_listener"), 0);
}

#[tokio::test]
async fn static_event_reaches_the_listener() {
    let (host, bridge) = setup();

    let (listener, received) = recording_listener(&bridge);
    bridge
        .add_static_event_listener(TEST_EVENTS, "StaticEvent", &listener)
        .await
        .expect("add succeeds");

    host.raise_static_event(TEST_EVENTS, "StaticEvent", WireValue::Str("ping".to_string()));

    assert_eq!(*received.lock().expect("listener log"), vec![Value::str("ping")]);
}

#[tokio::test]
async fn removed_listener_stops_receiving() {
    let (host, bridge) = setup();

    let object =
        bridge.create_instance(TEST_EVENTS, Vec::new()).await.expect("create succeeds");
    let (listener, received) = recording_listener(&bridge);

    bridge
        .add_event_listener(&object, "InstanceEvent", &listener)
        .await
        .expect("add succeeds");
    host.raise_event(object.handle, "InstanceEvent", WireValue::Int(1));

    bridge
        .remove_event_listener(&object, "InstanceEvent", listener.id)
        .await
        .expect("remove succeeds");
    host.raise_event(object.handle, "InstanceEvent", WireValue::Int(2));

    assert_eq!(*received.lock().expect("listener log"), vec![Value::Int(1)]);
    assert_eq!(host.call_count("remove_event_listener"), 1);
}

#[tokio::test]
async fn distinct_listeners_each_receive_the_event() {
    let (host, bridge) = setup();

    let (first, first_received) = recording_listener(&bridge);
    let (second, second_received) = recording_listener(&bridge);

    bridge
        .add_static_event_listener(TEST_EVENTS, "StaticEvent", &first)
        .await
        .expect("first add succeeds");
    bridge
        .add_static_event_listener(TEST_EVENTS, "StaticEvent", &second)
        .await
        .expect("second add succeeds");
    assert_eq!(host.call_count("add_static_event_listener"), 2);

    host.raise_static_event(TEST_EVENTS, "StaticEvent", WireValue::Bool(true));

    assert_eq!(*first_received.lock().expect("listener log"), vec![Value::Bool(true)]);
    assert_eq!(*second_received.lock().expect("listener log"), vec![Value::Bool(true)]);
}

#[tokio::test]
async fn release_drops_event_subscriptions_locally() {
    let (host, bridge) = setup();

    let object =
        bridge.create_instance(TEST_EVENTS, Vec::new()).await.expect("create succeeds");
    let (listener, received) = recording_listener(&bridge);
    bridge
        .add_event_listener(&object, "InstanceEvent", &listener)
        .await
        .expect("add succeeds");

    bridge.release_instance(&object).await.expect("release succeeds");

    // The native object is gone, so the bridge cancels its bindings
    // without issuing removal calls.
    assert_eq!(host.call_count("remove_event_listener"), 0);
    host.raise_event(object.handle, "InstanceEvent", WireValue::Int(9));
    assert!(received.lock().expect("listener log").is_empty());
}

#[tokio::test]
async fn injected_context_leads_the_native_arguments() {
    let (host, bridge) = setup();

    bridge.context().set_window(Some(Value::str("window")));

    let mut args = vec![Value::Bool(false)];
    inject_context(ContextKind::Window, &bridge.context(), &mut args)
        .expect("window context is current");
    // The scripted echo returns its first argument, which injection
    // made the window value.
    let result = bridge
        .invoke_static_method(TEST_METHODS, "echo", args)
        .await
        .expect("echo succeeds");

    assert_eq!(result, Value::str("window"));
    assert_eq!(host.call_count("invoke_static_method"), 1);
}

#[tokio::test]
async fn missing_context_fails_before_any_native_call() {
    let (host, bridge) = setup();

    let mut args = vec![Value::Bool(false)];
    let err = inject_context(ContextKind::Application, &bridge.context(), &mut args)
        .expect_err("no application context set");

    assert_eq!(err, BridgeError::ContextUnavailable(ContextKind::Application));
    assert_eq!(host.call_count("invoke_static_method"), 0);
}
