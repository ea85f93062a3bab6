//! Manifest parsing.
//!
//! A small recursive-descent parser over `quick-xml` events. Every
//! element is parsed against the fixed manifest vocabulary; anything
//! else is an error carrying the byte position, never skipped.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{ManifestError, RawDoc, RawMember, RawType};
use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::linked::{LinkedApi, LinkedMember, LinkedType};
use crate::member::{Event as EventMember, Member, Method, Parameter, Property};
use crate::platform::{Platform, PlatformSet};
use crate::typedef::{EnumValue, TypeDef, TypeKind};
use crate::typeref::{ContextKind, TypeRef};

/// Collected attributes of one element.
struct Attrs {
    element: String,
    position: u64,
    pairs: Vec<(String, String)>,
}

impl Attrs {
    fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn missing(&self, name: &str) -> ManifestError {
        ManifestError::MissingAttribute {
            element: self.element.clone(),
            attribute: name.to_string(),
            position: self.position,
        }
    }

    fn require(&self, name: &str) -> Result<&str, ManifestError> {
        self.get(name).ok_or_else(|| self.missing(name))
    }

    fn invalid(&self, name: &str, value: &str, reason: impl ToString) -> ManifestError {
        ManifestError::InvalidAttribute {
            element: self.element.clone(),
            attribute: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
            position: self.position,
        }
    }

    /// Boolean attribute; absent means `default`.
    fn flag(&self, name: &str, default: bool) -> Result<bool, ManifestError> {
        match self.get(name) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(self.invalid(name, other, "expected `true` or `false`")),
        }
    }

    fn platforms(&self) -> Result<Option<PlatformSet>, ManifestError> {
        match self.get("platforms") {
            None => Ok(None),
            Some(value) => PlatformSet::parse_names(value)
                .map(Some)
                .map_err(|e| self.invalid("platforms", value, e)),
        }
    }

    fn context(&self) -> Result<ContextKind, ManifestError> {
        match self.get("context") {
            None => Ok(ContextKind::None),
            Some(value) => ContextKind::parse(value).map_err(|e| self.invalid("context", value, e)),
        }
    }

    fn unexpected(&self) -> ManifestError {
        ManifestError::UnexpectedElement { element: self.element.clone(), position: self.position }
    }
}

/// One structural event: an opened element (possibly self-closing), a
/// closing tag, or end of input. Text, comments, and declarations are
/// skipped by the parser loop.
enum Node {
    Open { attrs: Attrs, empty: bool },
    Close(String),
    Eof,
}

struct Parser<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> Parser<R> {
    fn new(input: R) -> Self {
        Self { reader: Reader::from_reader(input), buf: Vec::new() }
    }

    fn next(&mut self) -> Result<Node, ManifestError> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|source| ManifestError::Xml { position, source })?;
            match event {
                Event::Start(start) => {
                    let attrs = collect_attrs(position, &start)?;
                    return Ok(Node::Open { attrs, empty: false });
                },
                Event::Empty(start) => {
                    let attrs = collect_attrs(position, &start)?;
                    return Ok(Node::Open { attrs, empty: true });
                },
                Event::End(end) => {
                    return Ok(Node::Close(String::from_utf8_lossy(end.name().as_ref()).into_owned()));
                },
                Event::Eof => return Ok(Node::Eof),
                // Whitespace, comments, and the XML declaration carry
                // no manifest content.
                Event::Text(_)
                | Event::Comment(_)
                | Event::CData(_)
                | Event::Decl(_)
                | Event::PI(_)
                | Event::DocType(_) => {},
            }
        }
    }

    /// Next node, treating end-of-input as an error.
    fn next_in_element(&mut self) -> Result<Node, ManifestError> {
        match self.next()? {
            Node::Eof => Err(ManifestError::UnexpectedEof),
            node => Ok(node),
        }
    }
}

fn collect_attrs(position: u64, start: &BytesStart<'_>) -> Result<Attrs, ManifestError> {
    let element = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut pairs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|source| ManifestError::Attr { position, source })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|source| ManifestError::Xml { position, source })?
            .into_owned();
        pairs.push((key, value));
    }
    Ok(Attrs { element, position, pairs })
}

/// Parse the shared document shape.
pub(super) fn read_doc<R: BufRead>(input: R) -> Result<RawDoc, ManifestError> {
    let mut parser = Parser::new(input);

    let (root, root_empty) = match parser.next()? {
        Node::Open { attrs, empty } => (attrs, empty),
        Node::Close(name) => {
            return Err(ManifestError::UnexpectedElement { element: name, position: 0 });
        },
        Node::Eof => return Err(ManifestError::UnexpectedEof),
    };
    if root.element != "api" {
        return Err(root.unexpected());
    }
    let platforms_value = root.require("platforms")?;
    let platforms = PlatformSet::parse_names(platforms_value)
        .map_err(|e| root.invalid("platforms", platforms_value, e))?;

    let mut doc = RawDoc { platforms, types: Vec::new(), sources: Vec::new() };
    if root_empty {
        return Ok(doc);
    }

    loop {
        match parser.next_in_element()? {
            Node::Open { attrs, empty } => match attrs.element.as_str() {
                "namespace" => read_namespace(&mut parser, &attrs, empty, &mut doc)?,
                "platform-sources" => read_sources(&mut parser, &attrs, empty, &mut doc)?,
                _ => return Err(attrs.unexpected()),
            },
            Node::Close(_) => return Ok(doc),
            Node::Eof => return Err(ManifestError::UnexpectedEof),
        }
    }
}

fn read_namespace<R: BufRead>(
    parser: &mut Parser<R>,
    attrs: &Attrs,
    empty: bool,
    doc: &mut RawDoc,
) -> Result<(), ManifestError> {
    let namespace = attrs.require("name")?.to_string();
    if empty {
        return Ok(());
    }

    loop {
        match parser.next_in_element()? {
            Node::Open { attrs, empty } => {
                let kind = match attrs.element.as_str() {
                    "class" => TypeKind::Class,
                    "struct" => TypeKind::Struct,
                    "enum" => TypeKind::Enum,
                    _ => return Err(attrs.unexpected()),
                };
                doc.types.push(read_type(parser, &attrs, empty, &namespace, kind)?);
            },
            Node::Close(_) => return Ok(()),
            Node::Eof => return Err(ManifestError::UnexpectedEof),
        }
    }
}

fn read_type<R: BufRead>(
    parser: &mut Parser<R>,
    attrs: &Attrs,
    empty: bool,
    namespace: &str,
    kind: TypeKind,
) -> Result<RawType, ManifestError> {
    let short_name = attrs.require("name")?;
    let qualified_name = if namespace.is_empty() {
        short_name.to_string()
    } else {
        format!("{namespace}.{short_name}")
    };
    let mut raw = RawType {
        qualified_name,
        kind,
        platforms: attrs.platforms()?,
        members: Vec::new(),
        values: Vec::new(),
    };
    if empty {
        return Ok(raw);
    }

    loop {
        match parser.next_in_element()? {
            Node::Open { attrs, empty } => match attrs.element.as_str() {
                "method" => {
                    let platforms = attrs.platforms()?;
                    let member = Member::Method(read_method(parser, &attrs, empty)?);
                    raw.members.push(RawMember { member, platforms });
                },
                "property" => {
                    let platforms = attrs.platforms()?;
                    let member = Member::Property(read_property(parser, &attrs, empty)?);
                    raw.members.push(RawMember { member, platforms });
                },
                "event" => {
                    let platforms = attrs.platforms()?;
                    let member = Member::Event(read_event(parser, &attrs, empty)?);
                    raw.members.push(RawMember { member, platforms });
                },
                "value" => {
                    let symbol = attrs.require("name")?.to_string();
                    let value_text = attrs.require("value")?;
                    let value = value_text
                        .parse::<i64>()
                        .map_err(|e| attrs.invalid("value", value_text, e))?;
                    raw.values.push(EnumValue { symbol, value });
                    if !empty {
                        expect_close(parser)?;
                    }
                },
                _ => return Err(attrs.unexpected()),
            },
            Node::Close(_) => return Ok(raw),
            Node::Eof => return Err(ManifestError::UnexpectedEof),
        }
    }
}

/// Inline type reference from `{prefix}type` / `{prefix}nullable`
/// attributes. Collections arrive as a child `<element>` handled by
/// the callers.
fn read_typeref(attrs: &Attrs, prefix: &str) -> Result<Option<TypeRef>, ManifestError> {
    let type_attr = format!("{prefix}type");
    let Some(name) = attrs.get(&type_attr) else {
        return Ok(None);
    };
    let nullable = attrs.flag(&format!("{prefix}nullable"), false)?;
    Ok(Some(TypeRef { name: name.to_string(), nullable, element: None, context: ContextKind::None }))
}

/// A `<element type=... nullable=...?/>` child converting an inline
/// reference into a collection of that element.
fn read_element_child(attrs: &Attrs) -> Result<TypeRef, ManifestError> {
    let name = attrs.require("type")?;
    let nullable = attrs.flag("nullable", false)?;
    Ok(TypeRef { name: name.to_string(), nullable, element: None, context: ContextKind::None })
}

fn read_method<R: BufRead>(
    parser: &mut Parser<R>,
    attrs: &Attrs,
    empty: bool,
) -> Result<Method, ManifestError> {
    let mut returns = read_typeref(attrs, "return-")?.unwrap_or_else(TypeRef::void);
    let mut method = Method {
        name: attrs.require("name")?.to_string(),
        is_static: attrs.flag("static", false)?,
        is_async: attrs.flag("async", false)?,
        parameters: Vec::new(),
        returns: TypeRef::void(),
        context: attrs.context()?,
    };
    if empty {
        method.returns = returns;
        return Ok(method);
    }

    loop {
        match parser.next_in_element()? {
            Node::Open { attrs, empty } => match attrs.element.as_str() {
                "parameter" => method.parameters.push(read_parameter(parser, &attrs, empty)?),
                "return-element" => {
                    let element = read_element_child(&attrs)?;
                    let nullable = returns.nullable;
                    returns = TypeRef::list(element);
                    returns.nullable = nullable;
                    if !empty {
                        expect_close(parser)?;
                    }
                },
                _ => return Err(attrs.unexpected()),
            },
            Node::Close(_) => {
                method.returns = returns;
                return Ok(method);
            },
            Node::Eof => return Err(ManifestError::UnexpectedEof),
        }
    }
}

fn read_parameter<R: BufRead>(
    parser: &mut Parser<R>,
    attrs: &Attrs,
    empty: bool,
) -> Result<Parameter, ManifestError> {
    let name = attrs.require("name")?.to_string();
    let Some(mut param_type) = read_typeref(attrs, "")? else {
        return Err(attrs.missing("type"));
    };
    param_type.context = attrs.context()?;

    if !empty {
        loop {
            match parser.next_in_element()? {
                Node::Open { attrs, empty } if attrs.element == "element" => {
                    let element = read_element_child(&attrs)?;
                    let context = param_type.context;
                    let nullable = param_type.nullable;
                    param_type = TypeRef::list(element);
                    param_type.nullable = nullable;
                    param_type.context = context;
                    if !empty {
                        expect_close(parser)?;
                    }
                },
                Node::Open { attrs, .. } => return Err(attrs.unexpected()),
                Node::Close(_) => break,
                Node::Eof => return Err(ManifestError::UnexpectedEof),
            }
        }
    }

    Ok(Parameter { name, param_type })
}

fn read_property<R: BufRead>(
    parser: &mut Parser<R>,
    attrs: &Attrs,
    empty: bool,
) -> Result<Property, ManifestError> {
    let Some(mut value_type) = read_typeref(attrs, "")? else {
        return Err(attrs.missing("type"));
    };
    let mut prop = Property {
        name: attrs.require("name")?.to_string(),
        is_static: attrs.flag("static", false)?,
        can_read: attrs.flag("read", true)?,
        can_write: attrs.flag("write", true)?,
        value_type: TypeRef::void(),
    };

    if !empty {
        loop {
            match parser.next_in_element()? {
                Node::Open { attrs, empty } if attrs.element == "element" => {
                    let element = read_element_child(&attrs)?;
                    let nullable = value_type.nullable;
                    value_type = TypeRef::list(element);
                    value_type.nullable = nullable;
                    if !empty {
                        expect_close(parser)?;
                    }
                },
                Node::Open { attrs, .. } => return Err(attrs.unexpected()),
                Node::Close(_) => break,
                Node::Eof => return Err(ManifestError::UnexpectedEof),
            }
        }
    }

    prop.value_type = value_type;
    Ok(prop)
}

fn read_event<R: BufRead>(
    parser: &mut Parser<R>,
    attrs: &Attrs,
    empty: bool,
) -> Result<EventMember, ManifestError> {
    let Some(mut arg_type) = read_typeref(attrs, "arg-")? else {
        return Err(attrs.missing("arg-type"));
    };

    if !empty {
        loop {
            match parser.next_in_element()? {
                Node::Open { attrs, empty } if attrs.element == "element" => {
                    let element = read_element_child(&attrs)?;
                    let nullable = arg_type.nullable;
                    arg_type = TypeRef::list(element);
                    arg_type.nullable = nullable;
                    if !empty {
                        expect_close(parser)?;
                    }
                },
                Node::Open { attrs, .. } => return Err(attrs.unexpected()),
                Node::Close(_) => break,
                Node::Eof => return Err(ManifestError::UnexpectedEof),
            }
        }
    }

    Ok(EventMember {
        name: attrs.require("name")?.to_string(),
        is_static: attrs.flag("static", false)?,
        arg_type,
    })
}

fn read_sources<R: BufRead>(
    parser: &mut Parser<R>,
    attrs: &Attrs,
    empty: bool,
    doc: &mut RawDoc,
) -> Result<(), ManifestError> {
    let platform_value = attrs.require("platform")?;
    let platform: Platform =
        platform_value.parse().map_err(|e: ModelError| attrs.invalid("platform", platform_value, e))?;
    let mut paths = Vec::new();

    if !empty {
        loop {
            match parser.next_in_element()? {
                Node::Open { attrs, empty } if attrs.element == "source" => {
                    paths.push(attrs.require("path")?.to_string());
                    if !empty {
                        expect_close(parser)?;
                    }
                },
                Node::Open { attrs, .. } => return Err(attrs.unexpected()),
                Node::Close(_) => break,
                Node::Eof => return Err(ManifestError::UnexpectedEof),
            }
        }
    }

    doc.sources.push((platform, paths));
    Ok(())
}

/// Consume the closing tag of an element that should have no children.
fn expect_close<R: BufRead>(parser: &mut Parser<R>) -> Result<(), ManifestError> {
    match parser.next_in_element()? {
        Node::Close(_) => Ok(()),
        Node::Open { attrs, .. } => Err(attrs.unexpected()),
        Node::Eof => Err(ManifestError::UnexpectedEof),
    }
}

/// Convert the shared document shape into a fragment, rejecting
/// merged-form attributes.
pub(super) fn fragment_from_doc(doc: RawDoc) -> Result<Fragment, ManifestError> {
    let platforms = doc.platforms.platforms();
    let [platform] = platforms[..] else {
        return Err(ManifestError::NotSinglePlatform { found: doc.platforms.names() });
    };

    let mut fragment = Fragment::new(platform);
    for raw in doc.types {
        if raw.platforms.is_some() {
            return Err(ManifestError::MergedAttributeInFragment {
                element: raw.kind.element_name().to_string(),
            });
        }
        let mut def = TypeDef::new(raw.qualified_name, raw.kind);
        for member in raw.members {
            if member.platforms.is_some() {
                return Err(ManifestError::MergedAttributeInFragment {
                    element: member.member.kind_label().to_string(),
                });
            }
            def.push_member(member.member)?;
        }
        for value in raw.values {
            def.push_enum_value(value.symbol, value.value)?;
        }
        fragment.push_type(def)?;
    }

    for (source_platform, paths) in doc.sources {
        if source_platform != platform {
            return Err(ManifestError::PlatformMismatch {
                path: "<platform-sources>".to_string(),
                expected: platform,
                found: source_platform,
            });
        }
        for path in paths {
            fragment.push_source(path);
        }
    }

    Ok(fragment)
}

/// Convert the shared document shape into a linked API.
pub(super) fn linked_from_doc(doc: RawDoc) -> Result<LinkedApi, ManifestError> {
    if !doc.sources.is_empty() {
        return Err(ManifestError::SourcesInMerged);
    }

    let mut types = Vec::new();
    for raw in doc.types {
        let type_platforms = raw.platforms.unwrap_or(doc.platforms);

        // Run the parsed members through a TypeDef so the model
        // invariants (identity uniqueness, struct events, reference
        // shape) hold for merged manifests too.
        let mut check = TypeDef::new(raw.qualified_name.clone(), raw.kind);
        let mut members = Vec::new();
        for member in raw.members {
            check.push_member(member.member.clone())?;
            members.push(LinkedMember {
                member: member.member,
                platforms: member.platforms.unwrap_or(type_platforms),
            });
        }
        for value in &raw.values {
            check.push_enum_value(value.symbol.clone(), value.value)?;
        }
        members.sort_by(member_order);

        types.push(LinkedType {
            qualified_name: raw.qualified_name,
            kind: raw.kind,
            platforms: type_platforms,
            members,
            enum_values: raw.values,
        });
    }
    types.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));

    Ok(LinkedApi { platforms: doc.platforms, types })
}

fn member_order(a: &LinkedMember, b: &LinkedMember) -> std::cmp::Ordering {
    a.member.id().cmp(&b.member.id())
}
