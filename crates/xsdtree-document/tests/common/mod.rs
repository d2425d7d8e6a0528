#![allow(dead_code)]

use std::sync::Arc;

use xsdtree_document::{NodeId, TreeOptions, XsdTree};
use xsdtree_schema::SchemaIndex;

pub const SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:ots="http://www.example.org/ots"
    xmlns:xi="http://www.w3.org/2001/XInclude" targetNamespace="http://www.example.org/ots"
    elementFormDefault="qualified">
  <xsd:element name="Ots">
    <xsd:complexType>
      <xsd:sequence>
        <xsd:element name="Definitions" type="ots:DefinitionsType" minOccurs="0"/>
        <xsd:element name="Network" type="ots:NetworkType"/>
        <xsd:element name="Run" minOccurs="0">
          <xsd:complexType>
            <xsd:choice>
              <xsd:element name="Duration" type="xsd:double"/>
              <xsd:sequence>
                <xsd:element name="Start" type="xsd:double"/>
                <xsd:element name="End" type="xsd:double"/>
              </xsd:sequence>
            </xsd:choice>
          </xsd:complexType>
        </xsd:element>
      </xsd:sequence>
      <xsd:attribute name="Version" type="xsd:string"/>
    </xsd:complexType>
  </xsd:element>
  <xsd:complexType name="DefinitionsType">
    <xsd:sequence>
      <xsd:element name="GtuType" minOccurs="0" maxOccurs="unbounded">
        <xsd:complexType>
          <xsd:attribute name="Id" type="xsd:string" use="required"/>
        </xsd:complexType>
      </xsd:element>
    </xsd:sequence>
  </xsd:complexType>
  <xsd:complexType name="NetworkType">
    <xsd:sequence>
      <xsd:element ref="xi:include" minOccurs="0" maxOccurs="unbounded"/>
      <xsd:element name="Node" type="ots:NodeType" minOccurs="0" maxOccurs="unbounded"/>
      <xsd:element name="Link" type="ots:LinkType" minOccurs="0" maxOccurs="unbounded"/>
    </xsd:sequence>
  </xsd:complexType>
  <xsd:complexType name="NodeType">
    <xsd:annotation>
      <xsd:documentation source="description">A point in the network.</xsd:documentation>
    </xsd:annotation>
    <xsd:attribute name="Id" type="xsd:string" use="required"/>
    <xsd:attribute name="Visible" type="xsd:boolean" default="true"/>
  </xsd:complexType>
  <xsd:complexType name="LinkType">
    <xsd:sequence>
      <xsd:element name="Speed" type="ots:SpeedType" minOccurs="0"/>
    </xsd:sequence>
    <xsd:attribute name="Id" type="xsd:string" use="required"/>
    <xsd:attribute name="NodeStart" type="xsd:string" use="required"/>
  </xsd:complexType>
  <xsd:simpleType name="SpeedType">
    <xsd:restriction base="xsd:string">
      <xsd:pattern value="[0-9]+ km/h"/>
    </xsd:restriction>
  </xsd:simpleType>
</xsd:schema>"#;

pub fn schema() -> Arc<SchemaIndex> {
    Arc::new(SCHEMA.parse().expect("Failed to parse schema"))
}

pub fn tree() -> XsdTree {
    XsdTree::new(schema(), TreeOptions::default()).expect("Failed to create tree")
}

/// Child of `parent` named `name`, expanding `parent`.
pub fn child(tree: &mut XsdTree, parent: NodeId, name: &str) -> NodeId {
    tree.children(parent)
        .unwrap()
        .into_iter()
        .find(|child| tree.node_name(*child) == name)
        .unwrap_or_else(|| panic!("no child {name}"))
}

pub fn names(tree: &XsdTree, nodes: &[NodeId]) -> Vec<String> {
    nodes.iter().map(|node| tree.node_name(*node)).collect()
}

/// One line per active node: path, attributes and value.
pub fn outline(tree: &XsdTree) -> Vec<String> {
    let mut lines = Vec::new();
    outline_node(tree, tree.root(), &mut lines);
    lines
}

fn outline_node(tree: &XsdTree, id: NodeId, lines: &mut Vec<String>) {
    if !tree.is_active(id) {
        return;
    }
    let mut line = tree.path_string(id).to_string();
    for attribute in tree.attributes(id) {
        if let Some(value) = &attribute.value {
            line.push_str(&format!(" {}={}", attribute.name, value));
        }
    }
    if let Some(value) = tree.value(id) {
        line.push_str(&format!(" '{value}'"));
    }
    lines.push(line);
    for child in tree.loaded_children(id) {
        outline_node(tree, *child, lines);
    }
}
