//! Members of a type definition: methods, properties, and events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::typeref::{ContextKind, TypeRef};

/// A named method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name (documentation and stub generation only; not
    /// part of member identity).
    pub name: String,

    /// Parameter type.
    pub param_type: TypeRef,
}

impl Parameter {
    /// Construct a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: TypeRef) -> Self {
        Self { name: name.into(), param_type }
    }
}

/// A callable member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// True for a static method (dispatched by type name, not handle).
    pub is_static: bool,
    /// True when the native implementation completes asynchronously.
    pub is_async: bool,
    /// Ordered parameters as the client sees them.
    pub parameters: Vec<Parameter>,
    /// Return type ([`TypeRef::void`] when none).
    pub returns: TypeRef,
    /// Implicit context injected by the native adapter at dispatch.
    pub context: ContextKind,
}

impl Method {
    /// The parameters that participate in cross-platform signature
    /// comparison: a single leading parameter carrying an implicit
    /// context kind is excluded, since only some reflectors surface
    /// the native context argument.
    #[must_use]
    pub fn effective_parameters(&self) -> &[Parameter] {
        match self.parameters.first() {
            Some(first) if first.param_type.context != ContextKind::None => &self.parameters[1..],
            _ => &self.parameters,
        }
    }
}

/// A readable and/or writable value member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// True for a static property.
    pub is_static: bool,
    /// True when the property has a getter.
    pub can_read: bool,
    /// True when the property has a setter.
    pub can_write: bool,
    /// Property value type.
    pub value_type: TypeRef,
}

/// A subscribable event member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Event name.
    pub name: String,
    /// True for a static event (subscription keyed by type name).
    pub is_static: bool,
    /// Type of the single event argument delivered to listeners.
    pub arg_type: TypeRef,
}

/// A member of a type definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Member {
    /// A callable method.
    Method(Method),
    /// A readable/writable property.
    Property(Property),
    /// A subscribable event.
    Event(Event),
}

impl Member {
    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Method(m) => &m.name,
            Self::Property(p) => &p.name,
            Self::Event(e) => &e.name,
        }
    }

    /// True for static members.
    #[must_use]
    pub fn is_static(&self) -> bool {
        match self {
            Self::Method(m) => m.is_static,
            Self::Property(p) => p.is_static,
            Self::Event(e) => e.is_static,
        }
    }

    /// Parameter arity. Properties and events have arity zero; methods
    /// count their client-visible parameters (leading implicit-context
    /// parameters excluded so identity is stable across reflectors).
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Method(m) => m.effective_parameters().len(),
            Self::Property(_) | Self::Event(_) => 0,
        }
    }

    /// The member's identity within its declaring type.
    #[must_use]
    pub fn id(&self) -> MemberId {
        MemberId { name: self.name().to_string(), is_static: self.is_static(), arity: self.arity() }
    }

    /// Lower-case kind label for diagnostics (`method`, `property`,
    /// `event`).
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Method(_) => "method",
            Self::Property(_) => "property",
            Self::Event(_) => "event",
        }
    }

    /// Check the type references carried by this member.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Method(m) => {
                for parameter in &m.parameters {
                    parameter.param_type.validate()?;
                }
                m.returns.validate()
            },
            Self::Property(p) => p.value_type.validate(),
            Self::Event(e) => e.arg_type.validate(),
        }
    }
}

/// Identity of a member within one type definition: unique by
/// `(name, is_static, arity)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId {
    /// Member name.
    pub name: String,
    /// Static flag.
    pub is_static: bool,
    /// Parameter arity.
    pub arity: usize,
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static {
            f.write_str("static ")?;
        }
        write!(f, "{}/{}", self.name, self.arity)
    }
}
