//! Platform-independent plugin API schema model.
//!
//! Data-only types describing the public API a native plugin exposes:
//! type references, members (methods, properties, events), type
//! definitions, per-platform [`Fragment`]s, and the validated merged
//! [`LinkedApi`]. Everything else in the workspace depends on this
//! crate; it performs no I/O beyond the manifest codec and holds no
//! runtime state.
//!
//! # Identity
//!
//! Type references are compared structurally, never by pointer or
//! registration identity. Member identity within a type definition is
//! the triple `(name, is_static, arity)`, see [`MemberId`].
//!
//! # Manifest
//!
//! The [`manifest`] module serializes fragments and linked APIs to the
//! plugin manifest XML document and parses them back losslessly.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fragment;
pub mod linked;
pub mod manifest;
pub mod member;
pub mod platform;
pub mod producer;
pub mod typedef;
pub mod typeref;

pub use error::ModelError;
pub use fragment::{Fragment, SourceLocation};
pub use linked::{LinkedApi, LinkedMember, LinkedType};
pub use member::{Event, Member, MemberId, Method, Parameter, Property};
pub use platform::{Platform, PlatformSet};
pub use producer::{FragmentProducer, ManifestProducer};
pub use typedef::{EnumValue, TypeDef, TypeKind};
pub use typeref::{ContextKind, TypeRef};
