//! Type definitions: classes, structs, and enums.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::member::{Member, MemberId};

/// Marshalling semantics of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Reference semantics: instances cross the bridge as opaque
    /// handles and must be explicitly released.
    Class,
    /// Value semantics: instances cross the bridge as a recursive
    /// field copy. Structs cannot declare events.
    Struct,
    /// A named set of integer values, marshalled as the underlying
    /// integer.
    Enum,
}

impl TypeKind {
    /// Manifest element name for this kind.
    #[must_use]
    pub fn element_name(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// One symbolic value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    /// Symbolic name, matched exactly across platforms.
    pub symbol: String,
    /// Underlying integer value.
    pub value: i64,
}

/// A platform-independent type definition.
///
/// Members are unique by [`MemberId`] and keep declaration order.
/// Invariants (member identity, struct-event exclusion, type reference
/// shape) are enforced at insertion, so a constructed `TypeDef` is
/// always internally consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Namespace-qualified name, e.g. `com.example.TestMethods`.
    /// Nested native types are flattened into this name by the
    /// reflector before fragment construction.
    pub qualified_name: String,

    /// Marshalling semantics.
    pub kind: TypeKind,

    members: IndexMap<MemberId, Member>,

    enum_values: Vec<EnumValue>,
}

impl TypeDef {
    /// An empty definition of the given kind.
    #[must_use]
    pub fn new(qualified_name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
            members: IndexMap::new(),
            enum_values: Vec::new(),
        }
    }

    /// Add a member, enforcing identity uniqueness, the struct-event
    /// exclusion, and type reference validity.
    pub fn push_member(&mut self, member: Member) -> Result<(), ModelError> {
        member.validate()?;

        if self.kind == TypeKind::Struct {
            if let Member::Event(event) = &member {
                return Err(ModelError::StructEvent {
                    type_name: self.qualified_name.clone(),
                    event: event.name.clone(),
                });
            }
        }

        let id = member.id();
        if self.members.contains_key(&id) {
            return Err(ModelError::DuplicateMember {
                type_name: self.qualified_name.clone(),
                id,
            });
        }

        self.members.insert(id, member);
        Ok(())
    }

    /// Add an enum value, enforcing kind and symbol uniqueness.
    pub fn push_enum_value(&mut self, symbol: impl Into<String>, value: i64) -> Result<(), ModelError> {
        if self.kind != TypeKind::Enum {
            return Err(ModelError::NotAnEnum(self.qualified_name.clone()));
        }

        let symbol = symbol.into();
        if self.enum_values.iter().any(|v| v.symbol == symbol) {
            return Err(ModelError::DuplicateEnumSymbol {
                type_name: self.qualified_name.clone(),
                symbol,
            });
        }

        self.enum_values.push(EnumValue { symbol, value });
        Ok(())
    }

    /// Members in declaration order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Member identities in declaration order.
    pub fn member_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.members.keys()
    }

    /// Look up a member by identity.
    #[must_use]
    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Ordered enum values (empty unless `kind` is [`TypeKind::Enum`]).
    #[must_use]
    pub fn enum_values(&self) -> &[EnumValue] {
        &self.enum_values
    }

    /// The namespace part of the qualified name (empty when the name
    /// has no dot).
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.qualified_name.rsplit_once('.').map_or("", |(ns, _)| ns)
    }

    /// The unqualified (short) name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.qualified_name.rsplit_once('.').map_or(self.qualified_name.as_str(), |(_, n)| n)
    }
}
