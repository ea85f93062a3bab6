//! Value marshalling between the client and channel representations.

use std::collections::BTreeMap;

use crate::error::BridgeError;
use crate::registry::{RegisteredType, TypeRegistry};
use crate::value::{DATE_RECORD_TYPE, ObjectRef, Value, WireValue};

/// Encode a client value for the channel.
///
/// Scalars pass through, dates become the tagged date record, lists
/// are element-wise and order-preserving. Structs, enums, and object
/// references require registration; an unregistered type is
/// [`BridgeError::UnregisteredType`].
pub fn to_wire(value: &Value, registry: &TypeRegistry) -> Result<WireValue, BridgeError> {
    match value {
        Value::Null => Ok(WireValue::Null),
        Value::Bool(b) => Ok(WireValue::Bool(*b)),
        Value::Int(i) => Ok(WireValue::Int(*i)),
        Value::Double(d) => Ok(WireValue::Double(*d)),
        Value::Str(s) => Ok(WireValue::Str(s.clone())),
        Value::Date(millis) => Ok(WireValue::date(*millis)),
        Value::List(items) => {
            let mut wire = Vec::with_capacity(items.len());
            for item in items {
                wire.push(to_wire(item, registry)?);
            }
            Ok(WireValue::List(wire))
        },
        Value::Struct { type_name, fields } => {
            match registry.lookup(type_name) {
                Some(RegisteredType::ByValue) => {},
                _ => return Err(BridgeError::UnregisteredType(type_name.clone())),
            }
            let mut wire_fields = BTreeMap::new();
            for (name, field) in fields {
                wire_fields.insert(name.clone(), to_wire(field, registry)?);
            }
            Ok(WireValue::Record { type_name: type_name.clone(), fields: wire_fields })
        },
        Value::Enum { type_name, symbol } => match registry.lookup(type_name) {
            Some(RegisteredType::Enum(symbols)) => symbols
                .get(symbol)
                .map(|value| WireValue::Int(*value))
                .ok_or_else(|| BridgeError::UnregisteredType(type_name.clone())),
            _ => Err(BridgeError::UnregisteredType(type_name.clone())),
        },
        Value::Object(object) => match registry.lookup(&object.type_name) {
            Some(RegisteredType::ByReference) => Ok(WireValue::Handle {
                type_name: object.type_name.clone(),
                handle: object.handle,
            }),
            _ => Err(BridgeError::UnregisteredType(object.type_name.clone())),
        },
    }
}

/// Decode a channel value for the client.
///
/// The date record becomes [`Value::Date`]; a record tagged with a
/// registered by-value type becomes a [`Value::Struct`]; a record
/// tagged with anything else is [`BridgeError::UnregisteredType`].
/// Enum values travel as plain integers and stay integers here; the
/// schema-aware caller converts them.
pub fn from_wire(value: WireValue, registry: &TypeRegistry) -> Result<Value, BridgeError> {
    match value {
        WireValue::Null => Ok(Value::Null),
        WireValue::Bool(b) => Ok(Value::Bool(b)),
        WireValue::Int(i) => Ok(Value::Int(i)),
        WireValue::Double(d) => Ok(Value::Double(d)),
        WireValue::Str(s) => Ok(Value::Str(s)),
        WireValue::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(from_wire(item, registry)?);
            }
            Ok(Value::List(values))
        },
        WireValue::Record { type_name, mut fields } => {
            if type_name == DATE_RECORD_TYPE {
                return match fields.remove("value") {
                    Some(WireValue::Int(millis)) => Ok(Value::Date(millis)),
                    _ => Err(BridgeError::UnregisteredType(type_name)),
                };
            }
            match registry.lookup(&type_name) {
                Some(RegisteredType::ByValue) => {},
                _ => return Err(BridgeError::UnregisteredType(type_name)),
            }
            let mut values = BTreeMap::new();
            for (name, field) in fields {
                values.insert(name, from_wire(field, registry)?);
            }
            Ok(Value::Struct { type_name, fields: values })
        },
        WireValue::Handle { type_name, handle } => match registry.lookup(&type_name) {
            Some(RegisteredType::ByReference) => {
                Ok(Value::Object(ObjectRef::new(type_name, handle)))
            },
            _ => Err(BridgeError::UnregisteredType(type_name)),
        },
    }
}
