//! Structural type references.
//!
//! A [`TypeRef`] names a type as it appears in a member signature:
//! scalar, class, struct, or enum by qualified name, optionally
//! nullable, optionally a collection of an element type. References
//! are compared structurally, never by identity: two refs are the
//! same type exactly when their fields are equal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Name used for collection type references.
pub const LIST_TYPE: &str = "list";

/// Name used for the absent return type.
pub const VOID_TYPE: &str = "void";

/// Kind of implicit context a method (or a reflected leading
/// parameter) requires at dispatch time.
///
/// When a method declares `Application` or `Window`, the native
/// adapter injects the host's current application/window value as the
/// true leading native argument; the client never supplies it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// No implicit context.
    #[default]
    None,
    /// The current application (or application context) is injected.
    Application,
    /// The current window (or activity) is injected.
    Window,
}

impl ContextKind {
    /// Manifest attribute value, or `None` when no context is declared
    /// (the attribute is omitted entirely).
    #[must_use]
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Application => Some("application"),
            Self::Window => Some("window"),
        }
    }

    /// Parse a manifest attribute value.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        match value {
            "application" => Ok(Self::Application),
            "window" => Ok(Self::Window),
            other => Err(ModelError::UnknownContextKind(other.to_string())),
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_attr().unwrap_or("none"))
    }
}

/// A structural reference to a type in a member signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Qualified type name, a scalar name (`string`, `int`, ...), or
    /// [`LIST_TYPE`] for collections.
    pub name: String,

    /// True when the absent value is a legal value of this reference.
    pub nullable: bool,

    /// Element type when this reference is a collection. The element
    /// must not itself be a collection (nesting depth is at most one).
    pub element: Option<Box<TypeRef>>,

    /// Implicit context kind. Only meaningful on a leading parameter
    /// produced by a reflector; checked uniformly by the linker.
    pub context: ContextKind,
}

impl TypeRef {
    /// A plain non-nullable reference to `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), nullable: false, element: None, context: ContextKind::None }
    }

    /// A nullable reference to `name`.
    #[must_use]
    pub fn nullable(name: impl Into<String>) -> Self {
        Self { nullable: true, ..Self::new(name) }
    }

    /// A collection of `element`, order-preserving on the wire.
    #[must_use]
    pub fn list(element: TypeRef) -> Self {
        Self {
            name: LIST_TYPE.to_string(),
            nullable: false,
            element: Some(Box::new(element)),
            context: ContextKind::None,
        }
    }

    /// The absent return type.
    #[must_use]
    pub fn void() -> Self {
        Self::new(VOID_TYPE)
    }

    /// Same reference with an implicit context kind attached.
    #[must_use]
    pub fn with_context(mut self, context: ContextKind) -> Self {
        self.context = context;
        self
    }

    /// True when this reference is a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.element.is_some()
    }

    /// True when this reference is the void return type.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.element.is_none() && self.name == VOID_TYPE
    }

    /// Check the nesting invariant: a collection's element must not
    /// itself be a collection.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.element.as_ref().is_some_and(|element| element.is_collection()) {
            return Err(ModelError::NestedCollection(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) => write!(f, "list<{element}>")?,
            None => f.write_str(&self.name)?,
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        let a = TypeRef::nullable("com.example.TestData");
        let b = TypeRef::nullable("com.example.TestData");
        assert_eq!(a, b);

        // Nullability is part of the structure.
        assert_ne!(a, TypeRef::new("com.example.TestData"));

        // So is the collection marker.
        assert_ne!(TypeRef::list(a.clone()), a);
    }

    #[test]
    fn nesting_depth_limited_to_one() {
        let flat = TypeRef::list(TypeRef::new("string"));
        assert!(flat.validate().is_ok());

        let nested = TypeRef::list(TypeRef::list(TypeRef::new("string")));
        assert!(matches!(nested.validate(), Err(ModelError::NestedCollection(_))));
    }

    #[test]
    fn display_forms() {
        assert_eq!(TypeRef::nullable("string").to_string(), "string?");
        assert_eq!(TypeRef::list(TypeRef::nullable("string")).to_string(), "list<string?>");
        assert_eq!(TypeRef::void().to_string(), "void");
    }

    #[test]
    fn context_attr_round_trip() {
        assert_eq!(ContextKind::parse("application"), Ok(ContextKind::Application));
        assert_eq!(ContextKind::parse("window"), Ok(ContextKind::Window));
        assert!(ContextKind::parse("activity").is_err());
        assert_eq!(ContextKind::Application.as_attr(), Some("application"));
        assert_eq!(ContextKind::None.as_attr(), None);
    }
}
