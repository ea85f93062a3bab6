//! Client-side and channel-side value representations.

use std::collections::BTreeMap;
use std::fmt;

/// Type tag of the record carrying a marshalled date. The angle
/// brackets keep it out of the qualified-name space any real plugin
/// type could occupy.
pub const DATE_RECORD_TYPE: &str = "<date>";

/// An opaque native object handle allocated by the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// Wrap a raw handle value.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A native event subscription token, issued by the native side on
/// listener registration and required to remove it again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Wrap a native-issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client-side reference to a live native object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Qualified name of the object's registered reference type.
    pub type_name: String,
    /// The native handle backing this reference.
    pub handle: Handle,
}

impl ObjectRef {
    /// Construct a reference.
    #[must_use]
    pub fn new(type_name: impl Into<String>, handle: Handle) -> Self {
        Self { type_name: type_name.into(), handle }
    }
}

/// A value as the client sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (also the encoding of an absent nullable).
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Double(f64),
    /// String.
    Str(String),
    /// Instant in milliseconds since the Unix epoch.
    Date(i64),
    /// Ordered collection.
    List(Vec<Value>),
    /// A by-value structure, marshalled field by field.
    Struct {
        /// Qualified name of the registered by-value type.
        type_name: String,
        /// Field values keyed by field name.
        fields: BTreeMap<String, Value>,
    },
    /// A symbolic enum value.
    Enum {
        /// Qualified name of the registered enum type.
        type_name: String,
        /// The symbolic name.
        symbol: String,
    },
    /// A by-reference native object.
    Object(ObjectRef),
}

impl Value {
    /// String convenience constructor.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }
}

/// A value as it crosses the native channel.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer (also the wire form of enum values).
    Int(i64),
    /// Floating point.
    Double(f64),
    /// String.
    Str(String),
    /// Ordered collection.
    List(Vec<WireValue>),
    /// A keyed record tagged with its type name. Dates travel as the
    /// [`DATE_RECORD_TYPE`] record with a single `value` field.
    Record {
        /// The tag naming the record's type.
        type_name: String,
        /// Field values keyed by field name.
        fields: BTreeMap<String, WireValue>,
    },
    /// A native object handle, tagged with its type name.
    Handle {
        /// Qualified name of the object's type.
        type_name: String,
        /// The handle value.
        handle: Handle,
    },
}

impl WireValue {
    /// The tagged record encoding of a date.
    #[must_use]
    pub fn date(millis: i64) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("value".to_string(), Self::Int(millis));
        Self::Record { type_name: DATE_RECORD_TYPE.to_string(), fields }
    }
}
