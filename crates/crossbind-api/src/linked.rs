//! The validated, merged, platform-independent schema.

use serde::{Deserialize, Serialize};

use crate::member::Member;
use crate::platform::PlatformSet;
use crate::typedef::{EnumValue, TypeKind};

/// A member of a linked type, recording which platforms implement it.
///
/// The linker guarantees that any member implemented on two or more
/// platforms has an identical observable signature everywhere; a
/// member present on exactly one platform is a platform-specific
/// extension whose stubbing elsewhere is the emitters' concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedMember {
    /// The merged member signature.
    pub member: Member,
    /// Platforms implementing this member.
    pub platforms: PlatformSet,
}

/// A merged type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedType {
    /// Namespace-qualified name.
    pub qualified_name: String,
    /// Marshalling semantics (identical on every declaring platform).
    pub kind: TypeKind,
    /// Platforms declaring this type.
    pub platforms: PlatformSet,
    /// Merged members, sorted by identity for deterministic output.
    pub members: Vec<LinkedMember>,
    /// Merged enum values (empty unless `kind` is [`TypeKind::Enum`]).
    pub enum_values: Vec<EnumValue>,
}

impl LinkedType {
    /// Look up a merged member by name (first match).
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&LinkedMember> {
        self.members.iter().find(|m| m.member.name() == name)
    }
}

/// The validated union of fragments for one target.
///
/// Created fresh by each link invocation and immutable once validation
/// succeeds; it is handed to exactly one emitter run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedApi {
    /// Union of the contributing platforms.
    pub platforms: PlatformSet,
    /// Merged types, sorted by qualified name.
    pub types: Vec<LinkedType>,
}

impl LinkedApi {
    /// Look up a merged type by qualified name.
    #[must_use]
    pub fn type_def(&self, qualified_name: &str) -> Option<&LinkedType> {
        self.types.iter().find(|t| t.qualified_name == qualified_name)
    }
}
