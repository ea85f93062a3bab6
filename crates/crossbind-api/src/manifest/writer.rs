//! Manifest serialization.
//!
//! Hand-rolled element emission keeps full control over attribute
//! order and indentation so manifests diff cleanly under version
//! control. Attribute values go through `quick-xml` escaping.

use std::io::Write;

use quick_xml::escape::escape;

use super::ManifestError;
use crate::fragment::Fragment;
use crate::linked::{LinkedApi, LinkedType};
use crate::member::{Event, Member, Method, Parameter, Property};
use crate::platform::PlatformSet;
use crate::typedef::{EnumValue, TypeDef};
use crate::typeref::{ContextKind, TypeRef};

const INDENT: &str = "  ";

/// One open-element line under construction.
struct Tag {
    line: String,
}

impl Tag {
    fn new(depth: usize, name: &str) -> Self {
        let mut line = INDENT.repeat(depth);
        line.push('<');
        line.push_str(name);
        Self { line }
    }

    fn attr(&mut self, name: &str, value: &str) -> &mut Self {
        self.line.push(' ');
        self.line.push_str(name);
        self.line.push_str("=\"");
        self.line.push_str(&escape(value));
        self.line.push('"');
        self
    }

    /// Boolean attribute, omitted when it matches the parse default.
    fn flag(&mut self, name: &str, value: bool, default: bool) -> &mut Self {
        if value != default {
            self.attr(name, if value { "true" } else { "false" });
        }
        self
    }

    fn open<W: Write>(self, out: &mut W) -> Result<(), ManifestError> {
        writeln!(out, "{}>", self.line)?;
        Ok(())
    }

    fn close<W: Write>(self, out: &mut W) -> Result<(), ManifestError> {
        writeln!(out, "{}/>", self.line)?;
        Ok(())
    }
}

fn close_tag<W: Write>(out: &mut W, depth: usize, name: &str) -> Result<(), ManifestError> {
    writeln!(out, "{}</{name}>", INDENT.repeat(depth))?;
    Ok(())
}

/// Serialize a single-platform fragment manifest.
pub(super) fn write_fragment<W: Write>(
    fragment: &Fragment,
    mut output: W,
) -> Result<(), ManifestError> {
    let out = &mut output;
    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;

    let mut root = Tag::new(0, "api");
    root.attr("platforms", fragment.platform.as_str());
    root.open(out)?;

    let types: Vec<&TypeDef> = fragment.types().collect();
    write_namespaces(out, &types, write_type_def)?;

    if !fragment.sources().is_empty() {
        let mut sources = Tag::new(1, "platform-sources");
        sources.attr("platform", fragment.platform.as_str());
        sources.open(out)?;
        for location in fragment.sources() {
            let mut source = Tag::new(2, "source");
            source.attr("path", &location.path);
            source.close(out)?;
        }
        close_tag(out, 1, "platform-sources")?;
    }

    close_tag(out, 0, "api")
}

/// Serialize a merged manifest.
pub(super) fn write_linked<W: Write>(
    linked: &LinkedApi,
    mut output: W,
) -> Result<(), ManifestError> {
    let out = &mut output;
    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;

    let mut root = Tag::new(0, "api");
    root.attr("platforms", &linked.platforms.names());
    root.open(out)?;

    let types: Vec<&LinkedType> = linked.types.iter().collect();
    write_namespaces(out, &types, write_linked_type)?;

    close_tag(out, 0, "api")
}

trait NamedType {
    fn qualified_name(&self) -> &str;
}

impl NamedType for TypeDef {
    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}

impl NamedType for LinkedType {
    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}

fn split_namespace(qualified_name: &str) -> (&str, &str) {
    match qualified_name.rfind('.') {
        Some(dot) => (&qualified_name[..dot], &qualified_name[dot + 1..]),
        None => ("", qualified_name),
    }
}

/// Group types into `<namespace>` blocks in first-appearance order.
fn write_namespaces<W, T, F>(out: &mut W, types: &[&T], mut write: F) -> Result<(), ManifestError>
where
    W: Write,
    T: NamedType,
    F: FnMut(&mut W, &T) -> Result<(), ManifestError>,
{
    let mut namespaces: Vec<&str> = Vec::new();
    for def in types {
        let (namespace, _) = split_namespace(def.qualified_name());
        if !namespaces.contains(&namespace) {
            namespaces.push(namespace);
        }
    }

    for namespace in namespaces {
        let mut tag = Tag::new(1, "namespace");
        tag.attr("name", namespace);
        tag.open(out)?;
        for def in types {
            if split_namespace(def.qualified_name()).0 == namespace {
                write(out, def)?;
            }
        }
        close_tag(out, 1, "namespace")?;
    }
    Ok(())
}

fn write_type_def<W: Write>(out: &mut W, def: &TypeDef) -> Result<(), ManifestError> {
    let element = def.kind.element_name();
    let mut tag = Tag::new(2, element);
    tag.attr("name", def.short_name());

    if def.member_count() == 0 && def.enum_values().is_empty() {
        return tag.close(out);
    }
    tag.open(out)?;
    for member in def.members() {
        write_member(out, member, None)?;
    }
    for value in def.enum_values() {
        write_enum_value(out, value)?;
    }
    close_tag(out, 2, element)
}

fn write_linked_type<W: Write>(out: &mut W, def: &LinkedType) -> Result<(), ManifestError> {
    let element = def.kind.element_name();
    let mut tag = Tag::new(2, element);
    let (_, short_name) = split_namespace(&def.qualified_name);
    tag.attr("name", short_name);
    tag.attr("platforms", &def.platforms.names());

    if def.members.is_empty() && def.enum_values.is_empty() {
        return tag.close(out);
    }
    tag.open(out)?;
    for linked in &def.members {
        write_member(out, &linked.member, Some(linked.platforms))?;
    }
    for value in &def.enum_values {
        write_enum_value(out, value)?;
    }
    close_tag(out, 2, element)
}

fn write_member<W: Write>(
    out: &mut W,
    member: &Member,
    platforms: Option<PlatformSet>,
) -> Result<(), ManifestError> {
    match member {
        Member::Method(method) => write_method(out, method, platforms),
        Member::Property(property) => write_property(out, property, platforms),
        Member::Event(event) => write_event(out, event, platforms),
    }
}

/// Inline type-reference attributes; the collection element child is
/// written separately by the caller.
fn typeref_attrs(tag: &mut Tag, prefix: &str, typeref: &TypeRef) {
    tag.attr(&format!("{prefix}type"), &typeref.name);
    if typeref.nullable {
        tag.attr(&format!("{prefix}nullable"), "true");
    }
}

fn context_attr(tag: &mut Tag, context: ContextKind) {
    if let Some(value) = context.as_attr() {
        tag.attr("context", value);
    }
}

fn platforms_attr(tag: &mut Tag, platforms: Option<PlatformSet>) {
    if let Some(platforms) = platforms {
        tag.attr("platforms", &platforms.names());
    }
}

/// The `<element>` child carrying a collection's element type.
fn element_child<W: Write>(
    out: &mut W,
    name: &str,
    depth: usize,
    typeref: &TypeRef,
) -> Result<(), ManifestError> {
    if let Some(element) = &typeref.element {
        let mut tag = Tag::new(depth, name);
        tag.attr("type", &element.name);
        if element.nullable {
            tag.attr("nullable", "true");
        }
        tag.close(out)?;
    }
    Ok(())
}

fn write_method<W: Write>(
    out: &mut W,
    method: &Method,
    platforms: Option<PlatformSet>,
) -> Result<(), ManifestError> {
    let mut tag = Tag::new(3, "method");
    tag.attr("name", &method.name);
    tag.flag("static", method.is_static, false);
    tag.flag("async", method.is_async, false);
    if !method.returns.is_void() {
        typeref_attrs(&mut tag, "return-", &method.returns);
    }
    context_attr(&mut tag, method.context);
    platforms_attr(&mut tag, platforms);

    let has_children = !method.parameters.is_empty() || method.returns.is_collection();
    if !has_children {
        return tag.close(out);
    }
    tag.open(out)?;
    element_child(out, "return-element", 4, &method.returns)?;
    for parameter in &method.parameters {
        write_parameter(out, parameter)?;
    }
    close_tag(out, 3, "method")
}

fn write_parameter<W: Write>(out: &mut W, parameter: &Parameter) -> Result<(), ManifestError> {
    let mut tag = Tag::new(4, "parameter");
    tag.attr("name", &parameter.name);
    typeref_attrs(&mut tag, "", &parameter.param_type);
    context_attr(&mut tag, parameter.param_type.context);

    if !parameter.param_type.is_collection() {
        return tag.close(out);
    }
    tag.open(out)?;
    element_child(out, "element", 5, &parameter.param_type)?;
    close_tag(out, 4, "parameter")
}

fn write_property<W: Write>(
    out: &mut W,
    property: &Property,
    platforms: Option<PlatformSet>,
) -> Result<(), ManifestError> {
    let mut tag = Tag::new(3, "property");
    tag.attr("name", &property.name);
    tag.flag("static", property.is_static, false);
    // Accessor flags are always explicit; they are the point of the
    // element.
    tag.attr("read", if property.can_read { "true" } else { "false" });
    tag.attr("write", if property.can_write { "true" } else { "false" });
    typeref_attrs(&mut tag, "", &property.value_type);
    platforms_attr(&mut tag, platforms);

    if !property.value_type.is_collection() {
        return tag.close(out);
    }
    tag.open(out)?;
    element_child(out, "element", 4, &property.value_type)?;
    close_tag(out, 3, "property")
}

fn write_event<W: Write>(
    out: &mut W,
    event: &Event,
    platforms: Option<PlatformSet>,
) -> Result<(), ManifestError> {
    let mut tag = Tag::new(3, "event");
    tag.attr("name", &event.name);
    tag.flag("static", event.is_static, false);
    typeref_attrs(&mut tag, "arg-", &event.arg_type);
    platforms_attr(&mut tag, platforms);

    if !event.arg_type.is_collection() {
        return tag.close(out);
    }
    tag.open(out)?;
    element_child(out, "element", 4, &event.arg_type)?;
    close_tag(out, 3, "event")
}

fn write_enum_value<W: Write>(out: &mut W, value: &EnumValue) -> Result<(), ManifestError> {
    let mut tag = Tag::new(3, "value");
    tag.attr("name", &value.symbol);
    tag.attr("value", &value.value.to_string());
    tag.close(out)
}
