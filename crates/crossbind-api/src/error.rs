//! Schema model errors.

use thiserror::Error;

use crate::member::MemberId;

/// Violations of the schema model's own invariants, raised while
/// constructing fragments and type definitions (before any linking).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A collection's element type was itself a collection.
    #[error("collection element of `{0}` must not itself be a collection")]
    NestedCollection(String),

    /// Two members of one type shared the identity
    /// `(name, is_static, arity)`.
    #[error("duplicate member `{id}` in type `{type_name}`")]
    DuplicateMember {
        /// Qualified name of the declaring type.
        type_name: String,
        /// The colliding member identity.
        id: MemberId,
    },

    /// A struct (value-semantics) type declared an event.
    #[error("struct `{type_name}` must not declare event `{event}`")]
    StructEvent {
        /// Qualified name of the struct.
        type_name: String,
        /// Name of the offending event.
        event: String,
    },

    /// Enum values were attached to a non-enum type.
    #[error("enum values are only valid on an enum; `{0}` is not an enum")]
    NotAnEnum(String),

    /// An enum declared one symbolic name twice.
    #[error("duplicate enum symbol `{symbol}` in `{type_name}`")]
    DuplicateEnumSymbol {
        /// Qualified name of the enum.
        type_name: String,
        /// The repeated symbolic name.
        symbol: String,
    },

    /// A fragment declared one qualified type name twice.
    #[error("duplicate type `{0}` in fragment")]
    DuplicateType(String),

    /// A platform name outside the supported set.
    #[error("unknown platform `{0}`")]
    UnknownPlatform(String),

    /// A context attribute value outside `application`/`window`.
    #[error("unknown implicit context kind `{0}`")]
    UnknownContextKind(String),
}
