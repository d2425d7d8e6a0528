//! Loading multi-file schemas through a resolver.

use pretty_assertions::assert_eq;
use xsdtree_schema::{
    ConstraintCategory, MemoryResolver, NodeKind, SchemaDiagnostic, SchemaError, SchemaIndex,
    SchemaLoader,
};

const NETWORK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:ots="http://www.example.org/ots"
    targetNamespace="http://www.example.org/ots" elementFormDefault="qualified">
  <xsd:include schemaLocation="types.xsd"/>
  <xsd:element name="Ots">
    <xsd:complexType>
      <xsd:sequence>
        <xsd:element name="Network" type="ots:NetworkType"/>
      </xsd:sequence>
    </xsd:complexType>
    <xsd:key name="NodeId">
      <xsd:selector xpath="ots:Network/ots:Node"/>
      <xsd:field xpath="@Id"/>
    </xsd:key>
    <xsd:keyref name="LinkStartNode" refer="ots:NodeId">
      <xsd:selector xpath="ots:Network/ots:Link"/>
      <xsd:field xpath="@NodeStart"/>
    </xsd:keyref>
  </xsd:element>
</xsd:schema>"#;

const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:ots="http://www.example.org/ots"
    targetNamespace="http://www.example.org/ots">
  <xsd:include schemaLocation="network.xsd"/>
  <xsd:complexType name="NetworkType">
    <xsd:sequence>
      <xsd:element name="Node" type="ots:NodeType" minOccurs="0" maxOccurs="unbounded"/>
      <xsd:element name="Link" type="ots:LinkType" minOccurs="0" maxOccurs="unbounded"/>
    </xsd:sequence>
  </xsd:complexType>
  <xsd:complexType name="NodeType">
    <xsd:annotation>
      <xsd:documentation>
        A node in
        the network.
      </xsd:documentation>
    </xsd:annotation>
    <xsd:attribute name="Id" type="xsd:string" use="required"/>
  </xsd:complexType>
  <xsd:complexType name="LinkType">
    <xsd:complexContent>
      <xsd:extension base="ots:BaseLinkType">
        <xsd:attribute name="NodeStart" type="xsd:string" use="required"/>
      </xsd:extension>
    </xsd:complexContent>
  </xsd:complexType>
  <xsd:complexType name="BaseLinkType">
    <xsd:attribute name="Id" type="xsd:string" use="required"/>
  </xsd:complexType>
  <xsd:complexType name="Unused"/>
</xsd:schema>"#;

fn load_network() -> SchemaIndex {
    let resolver = MemoryResolver::new()
        .with("xsd/network.xsd", NETWORK)
        .with("xsd/types.xsd", TYPES);
    SchemaLoader::new(resolver)
        .load("xsd/network.xsd")
        .expect("Failed to load schema")
}

#[test]
fn test_include_is_read_once() {
    let index = load_network();
    let files: Vec<&str> = index.read_files().iter().map(String::as_str).collect();
    assert_eq!(files, vec!["xsd/network.xsd", "xsd/types.xsd"]);
}

#[test]
fn test_root_defaults_to_first_element() {
    let index = load_network();
    assert_eq!(index.root_name(), "Ots");
    assert_eq!(index.attribute(index.root(), "name"), Some("Ots"));
}

#[test]
fn test_elements_by_path() {
    let index = load_network();
    let node = index.element("Ots.Network.Node").expect("Ots.Network.Node");
    // typed elements are replaced by their type
    assert_eq!(index.kind(node), &NodeKind::ComplexType);
    assert_eq!(index.attribute(node, "name"), Some("NodeType"));
    assert!(index.element("Ots.Network.Link").is_some());
    assert!(index.element("Ots.Network.Other").is_none());
}

#[test]
fn test_constraints_registered_under_root() {
    let index = load_network();
    let key = &index.keys()["Ots.NodeId"];
    assert_eq!(key.category, ConstraintCategory::Key);
    assert_eq!(key.context, "Ots");
    assert_eq!(key.selector, "Network/Node");
    assert_eq!(key.fields, vec!["@Id".to_string()]);

    let keyref = &index.keyrefs()["Ots.LinkStartNode"];
    assert_eq!(keyref.refer.as_deref(), Some("NodeId"));
    assert_eq!(keyref.full_path(), "Ots.LinkStartNode");
    assert!(index.uniques().is_empty());
}

#[test]
fn test_documentation_is_normalized() {
    let index = load_network();
    assert_eq!(
        index.documentation("Ots.Network.Node"),
        Some("A node in the network.")
    );
    assert_eq!(index.documentation("NodeType"), Some("A node in the network."));
}

#[test]
fn test_extension_with_forward_base() {
    let index = load_network();
    let derived = &index.extended_types()["BaseLinkType"];
    assert!(derived.contains("LinkType"));
    let link = index.type_def("LinkType").expect("LinkType");
    assert!(index.is_type(link, "BaseLinkType"));
    assert!(index.has_element_attribute(link, "Id"));
    assert!(index.has_element_attribute(link, "NodeStart"));
    assert!(!index.has_element_attribute(link, "Length"));
}

#[test]
fn test_diagnostics_report_unused_type() {
    let index = load_network();
    assert_eq!(
        index.diagnostics(),
        &[SchemaDiagnostic::UnusedType {
            name: "Unused".to_string()
        }]
    );
}

#[test]
fn test_keyref_to_missing_key() {
    let schema = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <xsd:element name="Root">
    <xsd:complexType>
      <xsd:sequence>
        <xsd:element name="Item" minOccurs="0" maxOccurs="unbounded">
          <xsd:complexType><xsd:attribute name="Ref" type="xsd:string"/></xsd:complexType>
        </xsd:element>
      </xsd:sequence>
    </xsd:complexType>
    <xsd:keyref name="ItemRef" refer="Missing">
      <xsd:selector xpath="Item"/>
      <xsd:field xpath="@Ref"/>
    </xsd:keyref>
    <xsd:unique name="ItemUnique">
      <xsd:selector xpath="Item"/>
      <xsd:field xpath="@Other"/>
    </xsd:unique>
  </xsd:element>
</xsd:schema>"#;
    let index: SchemaIndex = schema.parse().expect("schema");
    assert_eq!(
        index.diagnostics(),
        &[
            SchemaDiagnostic::FieldNotFound {
                category: ConstraintCategory::Unique,
                name: "ItemUnique".to_string(),
                selector: "Root.Item".to_string(),
                field: "@Other".to_string(),
            },
            SchemaDiagnostic::MissingKey {
                keyref: "ItemRef".to_string(),
                key: "Missing".to_string(),
            },
        ]
    );
}

#[test]
fn test_recursive_type_terminates() {
    let schema = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <xsd:element name="Root">
    <xsd:complexType>
      <xsd:sequence><xsd:element name="Item" type="ItemType"/></xsd:sequence>
    </xsd:complexType>
  </xsd:element>
  <xsd:complexType name="ItemType">
    <xsd:sequence>
      <xsd:element name="Item" type="ItemType" minOccurs="0"/>
    </xsd:sequence>
  </xsd:complexType>
</xsd:schema>"#;
    let index: SchemaIndex = schema.parse().expect("schema");
    assert!(index.element("Root.Item").is_some());
    assert!(index.element("Root.Item.Item").is_some());
    assert!(index.diagnostics().contains(&SchemaDiagnostic::RecursionHalted {
        path: "Root.Item.Item".to_string()
    }));
}

#[test]
fn test_missing_include_is_fatal() {
    let resolver = MemoryResolver::new().with("network.xsd", NETWORK);
    let err = SchemaLoader::new(resolver).load("network.xsd").unwrap_err();
    assert!(matches!(err, SchemaError::Resolve(_)));
}

#[test]
fn test_configured_root_not_found() {
    let resolver = MemoryResolver::new()
        .with("network.xsd", NETWORK)
        .with("types.xsd", TYPES);
    let err = SchemaLoader::new(resolver)
        .root_element(Some("Simulation".to_string()))
        .load("network.xsd")
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::RootNotFound {
            name: "Simulation".to_string()
        }
    );
}
