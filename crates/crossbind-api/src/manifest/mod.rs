//! Plugin manifest XML codec.
//!
//! One document shape serializes both a single-platform [`Fragment`]
//! and a merged [`LinkedApi`]:
//!
//! ```xml
//! <api platforms="android">
//!   <namespace name="com.example.test">
//!     <class name="TestMethods">
//!       <method name="echo" async="true" return-type="string" return-nullable="true">
//!         <parameter name="text" type="string"/>
//!         <parameter name="fail" type="boolean"/>
//!       </method>
//!       <event name="StaticEvent" static="true" arg-type="com.example.test.TestEvent"/>
//!     </class>
//!     <enum name="TestEnum">
//!       <value name="A" value="1"/>
//!     </enum>
//!   </namespace>
//!   <platform-sources platform="android">
//!     <source path="build/outputs/plugin.aar"/>
//!   </platform-sources>
//! </api>
//! ```
//!
//! The merged form differs in two ways: the root `platforms` attribute
//! lists every contributing platform, and every type and member
//! carries its own `platforms` attribute recording availability.
//! Fragment manifests must not carry per-member `platforms`
//! attributes, and merged manifests must not carry `platform-sources`
//! blocks. Both forms round-trip losslessly.
//!
//! Unknown elements and attributes with malformed values are rejected
//! with their document position; nothing is silently skipped.

mod reader;
mod writer;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::linked::LinkedApi;
use crate::member::Member;
use crate::platform::{Platform, PlatformSet};
use crate::typedef::{EnumValue, TypeKind};

/// Manifest parse and serialization errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying file or stream failure.
    #[error("manifest i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML.
    #[error("xml error at byte {position}: {source}")]
    Xml {
        /// Byte offset into the document.
        position: u64,
        /// The underlying parser error.
        #[source]
        source: quick_xml::Error,
    },

    /// Malformed attribute syntax.
    #[error("attribute error at byte {position}: {source}")]
    Attr {
        /// Byte offset into the document.
        position: u64,
        /// The underlying attribute error.
        #[source]
        source: quick_xml::events::attributes::AttrError,
    },

    /// An element the manifest vocabulary does not define.
    #[error("unexpected element `<{element}>` at byte {position}")]
    UnexpectedElement {
        /// The offending element name.
        element: String,
        /// Byte offset into the document.
        position: u64,
    },

    /// A required attribute was absent.
    #[error("missing attribute `{attribute}` on `<{element}>` at byte {position}")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
        /// Byte offset into the document.
        position: u64,
    },

    /// An attribute value that does not parse.
    #[error(
        "invalid value `{value}` for attribute `{attribute}` on `<{element}>` at byte {position}: {reason}"
    )]
    InvalidAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
        /// The rejected value.
        value: String,
        /// Why the value was rejected.
        reason: String,
        /// Byte offset into the document.
        position: u64,
    },

    /// The document ended before the root element was closed.
    #[error("unexpected end of manifest document")]
    UnexpectedEof,

    /// A fragment manifest must declare exactly one platform.
    #[error("fragment manifest must declare exactly one platform, found `{found}`")]
    NotSinglePlatform {
        /// The declared `platforms` attribute value.
        found: String,
    },

    /// A fragment manifest carried merged-form `platforms` attributes.
    #[error("fragment manifest must not carry a `platforms` attribute on `<{element}>`")]
    MergedAttributeInFragment {
        /// The offending element name.
        element: String,
    },

    /// A merged manifest carried fragment-form source blocks.
    #[error("merged manifest must not carry `<platform-sources>` blocks")]
    SourcesInMerged,

    /// A manifest declared a different platform than expected.
    #[error("manifest `{path}` declares platform `{found}`, expected `{expected}`")]
    PlatformMismatch {
        /// The manifest path.
        path: String,
        /// The platform the caller asked for.
        expected: Platform,
        /// The platform the manifest declares.
        found: Platform,
    },

    /// The parsed document violates a schema model invariant.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Intermediate document shared by the fragment and merged forms.
#[derive(Debug)]
struct RawDoc {
    platforms: PlatformSet,
    types: Vec<RawType>,
    sources: Vec<(Platform, Vec<String>)>,
}

#[derive(Debug)]
struct RawType {
    qualified_name: String,
    kind: TypeKind,
    platforms: Option<PlatformSet>,
    members: Vec<RawMember>,
    values: Vec<EnumValue>,
}

#[derive(Debug)]
struct RawMember {
    member: Member,
    platforms: Option<PlatformSet>,
}

/// Parse a single-platform fragment manifest.
pub fn read_fragment<R: Read>(input: R) -> Result<Fragment, ManifestError> {
    reader::fragment_from_doc(reader::read_doc(BufReader::new(input))?)
}

/// Parse a merged manifest.
pub fn read_linked<R: Read>(input: R) -> Result<LinkedApi, ManifestError> {
    reader::linked_from_doc(reader::read_doc(BufReader::new(input))?)
}

/// Serialize a fragment manifest.
pub fn write_fragment<W: Write>(fragment: &Fragment, output: W) -> Result<(), ManifestError> {
    writer::write_fragment(fragment, output)
}

/// Serialize a merged manifest.
pub fn write_linked<W: Write>(linked: &LinkedApi, output: W) -> Result<(), ManifestError> {
    writer::write_linked(linked, output)
}

/// Load a fragment manifest from a file.
pub fn load_fragment(path: &Path) -> Result<Fragment, ManifestError> {
    read_fragment(File::open(path)?)
}

/// Save a fragment manifest to a file.
pub fn save_fragment(fragment: &Fragment, path: &Path) -> Result<(), ManifestError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_fragment(fragment, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Load a merged manifest from a file.
pub fn load_linked(path: &Path) -> Result<LinkedApi, ManifestError> {
    read_linked(File::open(path)?)
}

/// Save a merged manifest to a file.
pub fn save_linked(linked: &LinkedApi, path: &Path) -> Result<(), ManifestError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_linked(linked, &mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{Event, Method, Parameter, Property};
    use crate::typedef::TypeDef;
    use crate::typeref::{ContextKind, TypeRef};

    fn sample_fragment() -> Fragment {
        let mut methods = TypeDef::new("com.example.test.TestMethods", TypeKind::Class);
        methods
            .push_member(Member::Method(Method {
                name: "echo".to_string(),
                is_static: false,
                is_async: true,
                parameters: vec![
                    Parameter::new(
                        "context",
                        TypeRef::new("android.content.Context")
                            .with_context(ContextKind::Application),
                    ),
                    Parameter::new("text", TypeRef::new("string")),
                    Parameter::new("fail", TypeRef::new("boolean")),
                ],
                returns: TypeRef::nullable("string"),
                context: ContextKind::None,
            }))
            .unwrap();
        methods
            .push_member(Member::Method(Method {
                name: "echoSequence".to_string(),
                is_static: true,
                is_async: false,
                parameters: vec![Parameter::new("items", TypeRef::list(TypeRef::new("integer")))],
                returns: TypeRef::list(TypeRef::nullable("string")),
                context: ContextKind::None,
            }))
            .unwrap();
        methods
            .push_member(Member::Property(Property {
                name: "staticProperty".to_string(),
                is_static: true,
                can_read: true,
                can_write: false,
                value_type: TypeRef::nullable("string"),
            }))
            .unwrap();
        methods
            .push_member(Member::Event(Event {
                name: "InstanceEvent".to_string(),
                is_static: false,
                arg_type: TypeRef::new("com.example.test.TestEvent"),
            }))
            .unwrap();

        let mut colors = TypeDef::new("com.example.test.TestEnum", TypeKind::Enum);
        colors.push_enum_value("Zero", 0).unwrap();
        colors.push_enum_value("One", 1).unwrap();

        let mut fragment = Fragment::new(Platform::Android);
        fragment.push_type(methods).unwrap();
        fragment.push_type(colors).unwrap();
        fragment.push_source("build/outputs/aar/plugin.aar");
        fragment
    }

    #[test]
    fn fragment_round_trip() {
        let fragment = sample_fragment();
        let mut buf = Vec::new();
        write_fragment(&fragment, &mut buf).unwrap();

        let parsed = read_fragment(buf.as_slice()).unwrap();
        assert_eq!(parsed, fragment);
    }

    #[test]
    fn fragment_collection_shape_survives() {
        let fragment = sample_fragment();
        let mut buf = Vec::new();
        write_fragment(&fragment, &mut buf).unwrap();
        let parsed = read_fragment(buf.as_slice()).unwrap();

        let def = parsed.type_def("com.example.test.TestMethods").unwrap();
        let member = def
            .members()
            .find(|m| m.name() == "echoSequence")
            .unwrap();
        let Member::Method(method) = member else {
            panic!("expected a method");
        };
        assert!(method.returns.is_collection());
        assert!(method.returns.element.as_deref().unwrap().nullable);
        assert!(method.parameters[0].param_type.is_collection());
    }

    #[test]
    fn implicit_context_parameter_survives() {
        let fragment = sample_fragment();
        let mut buf = Vec::new();
        write_fragment(&fragment, &mut buf).unwrap();
        let parsed = read_fragment(buf.as_slice()).unwrap();

        let def = parsed.type_def("com.example.test.TestMethods").unwrap();
        let Some(Member::Method(echo)) = def.members().find(|m| m.name() == "echo") else {
            panic!("expected echo");
        };
        assert_eq!(echo.parameters[0].param_type.context, ContextKind::Application);
        assert_eq!(echo.effective_parameters().len(), 2);
    }

    #[test]
    fn linked_round_trip() {
        let all = PlatformSet::ANDROID | PlatformSet::IOS;
        let linked = crate::linked::LinkedApi {
            platforms: all,
            types: vec![crate::linked::LinkedType {
                qualified_name: "com.example.test.TestStruct".to_string(),
                kind: TypeKind::Struct,
                platforms: all,
                members: vec![crate::linked::LinkedMember {
                    member: Member::Property(Property {
                        name: "value".to_string(),
                        is_static: false,
                        can_read: true,
                        can_write: true,
                        value_type: TypeRef::nullable("datetime"),
                    }),
                    platforms: PlatformSet::ANDROID,
                }],
                enum_values: Vec::new(),
            }],
        };

        let mut buf = Vec::new();
        write_linked(&linked, &mut buf).unwrap();
        let parsed = read_linked(buf.as_slice()).unwrap();
        assert_eq!(parsed, linked);
    }

    #[test]
    fn fragment_rejects_multiple_platforms() {
        let doc = br#"<?xml version="1.0" encoding="utf-8"?>
<api platforms="android,ios"></api>"#;
        let err = read_fragment(doc.as_slice()).unwrap_err();
        assert!(matches!(err, ManifestError::NotSinglePlatform { .. }));
    }

    #[test]
    fn fragment_rejects_merged_attributes() {
        let doc = br#"<?xml version="1.0" encoding="utf-8"?>
<api platforms="android">
  <namespace name="com.example">
    <class name="A" platforms="android"/>
  </namespace>
</api>"#;
        let err = read_fragment(doc.as_slice()).unwrap_err();
        assert!(matches!(err, ManifestError::MergedAttributeInFragment { .. }));
    }

    #[test]
    fn merged_rejects_sources() {
        let doc = br#"<?xml version="1.0" encoding="utf-8"?>
<api platforms="android,ios">
  <platform-sources platform="android">
    <source path="a.aar"/>
  </platform-sources>
</api>"#;
        let err = read_linked(doc.as_slice()).unwrap_err();
        assert!(matches!(err, ManifestError::SourcesInMerged));
    }

    #[test]
    fn unknown_element_is_rejected_with_position() {
        let doc = br#"<?xml version="1.0" encoding="utf-8"?>
<api platforms="android">
  <namespace name="com.example">
    <interface name="A"/>
  </namespace>
</api>"#;
        let err = read_fragment(doc.as_slice()).unwrap_err();
        let ManifestError::UnexpectedElement { element, position } = err else {
            panic!("expected UnexpectedElement, got {err:?}");
        };
        assert_eq!(element, "interface");
        assert!(position > 0);
    }

    #[test]
    fn missing_attribute_is_reported() {
        let doc = br#"<?xml version="1.0" encoding="utf-8"?>
<api platforms="android">
  <namespace name="com.example">
    <class name="A">
      <method/>
    </class>
  </namespace>
</api>"#;
        let err = read_fragment(doc.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingAttribute { ref element, ref attribute, .. }
                if element == "method" && attribute == "name"
        ));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut fragment = Fragment::new(Platform::Windows);
        let mut def = TypeDef::new("Example.Quotes", TypeKind::Class);
        def.push_member(Member::Method(Method {
            name: "compare".to_string(),
            is_static: false,
            is_async: false,
            parameters: vec![Parameter::new("left", TypeRef::new("string"))],
            returns: TypeRef::void(),
            context: ContextKind::None,
        }))
        .unwrap();
        fragment.push_type(def).unwrap();
        fragment.push_source(r#"out\a&b "c".dll"#);

        let mut buf = Vec::new();
        write_fragment(&fragment, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("&amp;"));
        assert!(text.contains("&quot;"));

        let parsed = read_fragment(buf.as_slice()).unwrap();
        assert_eq!(parsed.sources()[0].path, r#"out\a&b "c".dll"#);
    }
}
