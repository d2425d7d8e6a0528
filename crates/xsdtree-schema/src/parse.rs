//! Parsing XSD text into the node arena.
//!
//! QName-valued attributes are normalized while parsing so that the loader
//! never has to deal with prefixes: built-in XSD types become `xsd:<local>`,
//! `xi:include` stays `xi:include`, and all other names lose their prefix.

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::SchemaError;
use crate::node::{NodeKind, SchemaNode, SchemaNodeId, SchemaNodes};

pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XI_NS: &str = "http://www.w3.org/2001/XInclude";

const MAX_XSD_SIZE: usize = 16 * 1024 * 1024;

/// Attributes whose values are QNames.
const QNAME_ATTRIBUTES: &[&str] = &["type", "base", "ref", "refer", "itemType", "substitutionGroup"];

pub const XSD_BUILTIN_TYPES: [&str; 46] = [
    "ENTITIES",
    "ENTITY",
    "ID",
    "IDREF",
    "IDREFS",
    "NCName",
    "NMTOKEN",
    "NMTOKENS",
    "NOTATION",
    "Name",
    "QName",
    "anySimpleType",
    "anyType",
    "anyURI",
    "base64Binary",
    "boolean",
    "byte",
    "date",
    "dateTime",
    "decimal",
    "double",
    "duration",
    "float",
    "gDay",
    "gMonth",
    "gMonthDay",
    "gYear",
    "gYearMonth",
    "hexBinary",
    "int",
    "integer",
    "language",
    "long",
    "negativeInteger",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "normalizedString",
    "positiveInteger",
    "short",
    "string",
    "time",
    "token",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

/// Parses `content` into `nodes`, returning the id of the document node.
pub fn parse_schema(
    nodes: &mut SchemaNodes,
    location: &str,
    content: &str,
) -> Result<SchemaNodeId, SchemaError> {
    if content.len() > MAX_XSD_SIZE {
        return Err(SchemaError::TooLarge {
            location: location.to_string(),
            size: content.len(),
        });
    }
    let options = ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(content, options).map_err(|e| SchemaError::Xml {
        location: location.to_string(),
        message: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XS_NS) {
        return Err(SchemaError::NotASchema {
            location: location.to_string(),
        });
    }

    let file = nodes.add_file(location);
    let document = nodes.create(SchemaNode::new(NodeKind::Document, file));
    convert(nodes, document, root, file);
    Ok(document)
}

fn convert(nodes: &mut SchemaNodes, parent: SchemaNodeId, element: Node<'_, '_>, file: usize) {
    let kind = element_kind(element);
    let mut node = SchemaNode::new(kind, file);
    for attribute in element.attributes() {
        let name = attribute.name();
        let value = if QNAME_ATTRIBUTES.contains(&name) {
            normalize_qname(element, attribute.value())
        } else if name == "memberTypes" {
            attribute
                .value()
                .split_whitespace()
                .map(|member| normalize_qname(element, member))
                .collect::<Vec<_>>()
                .join(" ")
        } else if name == "xpath" {
            strip_xpath_prefixes(attribute.value())
        } else {
            attribute.value().to_string()
        };
        node.attributes.insert(name.to_string(), value);
    }
    let text: String = element
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();
    if !text.trim().is_empty() {
        node.text = Some(text);
    }
    let id = nodes.create_child(parent, node);
    for child in element.children().filter(|child| child.is_element()) {
        convert(nodes, id, child, file);
    }
}

fn element_kind(element: Node<'_, '_>) -> NodeKind {
    let tag = element.tag_name();
    if tag.namespace() == Some(XS_NS) {
        return NodeKind::from_xsd_local_name(tag.name());
    }
    let qualified = match tag
        .namespace()
        .and_then(|ns| element.lookup_prefix(ns))
        .filter(|prefix| !prefix.is_empty())
    {
        Some(prefix) => format!("{prefix}:{}", tag.name()),
        None => tag.name().to_string(),
    };
    NodeKind::Foreign(qualified)
}

pub fn is_builtin_type(local: &str) -> bool {
    XSD_BUILTIN_TYPES.contains(&local)
}

/// Normalizes a QName in the scope of `element`.
fn normalize_qname(element: Node<'_, '_>, value: &str) -> String {
    let value = value.trim();
    match value.split_once(':') {
        Some((prefix, local)) => match element.lookup_namespace_uri(Some(prefix)) {
            Some(XS_NS) => format!("xsd:{local}"),
            Some(XI_NS) => format!("xi:{local}"),
            _ => local.to_string(),
        },
        None => {
            if element.lookup_namespace_uri(None) == Some(XS_NS) && is_builtin_type(value) {
                format!("xsd:{value}")
            } else {
                value.to_string()
            }
        }
    }
}

/// Drops namespace prefixes from the steps of a selector or field XPath.
pub fn strip_xpath_prefixes(xpath: &str) -> String {
    let mut out = String::with_capacity(xpath.len());
    let mut word = String::new();
    for c in xpath.chars() {
        if c == ':' && !word.is_empty() {
            word.clear();
            continue;
        }
        if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
            word.push(c);
        } else {
            out.push_str(&word);
            word.clear();
            out.push(c);
        }
    }
    out.push_str(&word);
    out
}
