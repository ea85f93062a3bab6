//! Link-time validation errors.

use std::fmt;

use crossbind_api::MemberId;
use thiserror::Error;

/// One schema conflict found while linking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The same qualified name is declared with different kinds.
    #[error("type `{type_name}` is declared as {first_kind} on {first_platforms} but as {second_kind} on {second_platforms}")]
    KindMismatch {
        /// Qualified type name.
        type_name: String,
        /// Kind seen first, in input order.
        first_kind: &'static str,
        /// Platforms declaring the first kind.
        first_platforms: String,
        /// The conflicting kind.
        second_kind: &'static str,
        /// Platforms declaring the conflicting kind.
        second_platforms: String,
    },

    /// A member shared across platforms disagrees on its signature.
    #[error("member `{member}` of `{type_name}` has conflicting signatures between {left_platforms} and {right_platforms}: {detail}")]
    SignatureMismatch {
        /// Qualified type name.
        type_name: String,
        /// Identity of the conflicting member.
        member: MemberId,
        /// Platforms contributing one signature.
        left_platforms: String,
        /// Platforms contributing the other.
        right_platforms: String,
        /// Human-readable description of the difference.
        detail: String,
    },

    /// A member shared across platforms disagrees on its implicit
    /// context kind.
    #[error("member `{member}` of `{type_name}` has conflicting implicit context kinds between {left_platforms} and {right_platforms}")]
    ContextMismatch {
        /// Qualified type name.
        type_name: String,
        /// Identity of the conflicting member.
        member: MemberId,
        /// Platforms contributing one context kind.
        left_platforms: String,
        /// Platforms contributing the other.
        right_platforms: String,
    },

    /// An enum's symbol sets differ between declaring platforms.
    #[error("enum `{type_name}` declares symbol `{symbol}` on {declaring} but not on {missing}")]
    EnumSymbolMismatch {
        /// Qualified enum name.
        type_name: String,
        /// The symbol present on only some platforms.
        symbol: String,
        /// Platforms declaring the symbol.
        declaring: String,
        /// Platforms missing it.
        missing: String,
    },

    /// The same enum symbol maps to different integers.
    #[error("enum `{type_name}` symbol `{symbol}` has value {left_value} on {left_platforms} but {right_value} on {right_platforms}")]
    EnumValueConflict {
        /// Qualified enum name.
        type_name: String,
        /// The conflicting symbol.
        symbol: String,
        /// Integer on one side.
        left_value: i64,
        /// Platforms declaring it.
        left_platforms: String,
        /// Integer on the other side.
        right_value: i64,
        /// Platforms declaring that one.
        right_platforms: String,
    },
}

/// The non-empty set of conflicts that failed a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkErrors {
    errors: Vec<ValidationError>,
}

impl LinkErrors {
    /// Wrap collected errors. Callers must pass at least one; an empty
    /// vector would make a failed link indistinguishable from success.
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    /// The individual validation errors, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Number of conflicts found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false; a successful link returns `Ok` instead.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for LinkErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "linking failed with {} conflict(s):", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, "  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LinkErrors {}
