#![allow(dead_code)]

use std::sync::Arc;

use xsdtree::{Editor, EditorConfig, NodeId, XsdTree};
use xsdtree_schema::SchemaIndex;

/// A network of nodes and links. Node ids are a key within the network,
/// links refer to their start node and have unique names.
pub const SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:ots="http://www.example.org/ots"
    targetNamespace="http://www.example.org/ots" elementFormDefault="qualified">
  <xsd:element name="Ots">
    <xsd:complexType>
      <xsd:sequence>
        <xsd:element name="Network" type="ots:NetworkType">
          <xsd:key name="NodeId">
            <xsd:selector xpath="ots:Node"/>
            <xsd:field xpath="@Id"/>
          </xsd:key>
          <xsd:keyref name="LinkStartNode" refer="ots:NodeId">
            <xsd:selector xpath="ots:Link"/>
            <xsd:field xpath="@NodeStart"/>
          </xsd:keyref>
          <xsd:unique name="LinkName">
            <xsd:selector xpath="ots:Link"/>
            <xsd:field xpath="ots:Name"/>
          </xsd:unique>
        </xsd:element>
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
  <xsd:complexType name="NetworkType">
    <xsd:sequence>
      <xsd:element name="Node" type="ots:NodeType" minOccurs="0" maxOccurs="unbounded"/>
      <xsd:element name="Link" type="ots:LinkType" minOccurs="0" maxOccurs="unbounded"/>
    </xsd:sequence>
  </xsd:complexType>
  <xsd:complexType name="NodeType">
    <xsd:attribute name="Id" type="xsd:string" use="required"/>
    <xsd:attribute name="Visible" type="xsd:boolean" default="true"/>
  </xsd:complexType>
  <xsd:complexType name="LinkType">
    <xsd:sequence>
      <xsd:element name="Name" type="xsd:string" minOccurs="0"/>
    </xsd:sequence>
    <xsd:attribute name="Id" type="xsd:string" use="required"/>
    <xsd:attribute name="NodeStart" type="xsd:string" use="required"/>
  </xsd:complexType>
</xsd:schema>"#;

/// Index of the `NodeStart` attribute of a link.
pub const NODE_START: usize = 1;

pub fn schema() -> Arc<SchemaIndex> {
    Arc::new(SCHEMA.parse().expect("Failed to parse schema"))
}

pub fn editor() -> Editor {
    Editor::new(schema(), EditorConfig::default()).expect("Failed to create editor")
}

/// Child of `parent` named `name`, expanding `parent`.
pub fn child(editor: &mut Editor, parent: NodeId, name: &str) -> NodeId {
    editor
        .children(parent)
        .unwrap()
        .into_iter()
        .find(|child| editor.tree().node_name(*child) == name)
        .unwrap_or_else(|| panic!("no child {name}"))
}

/// The network with an active node `A` and an active link `L` starting
/// at it.
pub struct Network {
    pub editor: Editor,
    pub network: NodeId,
    pub node: NodeId,
    pub link: NodeId,
}

pub fn network() -> Network {
    let mut editor = editor();
    let root = editor.root();
    let network = child(&mut editor, root, "Network");
    let node = child(&mut editor, network, "Node");
    editor.activate(node).unwrap();
    editor.set_id(node, "A").unwrap();
    let link = child(&mut editor, network, "Link");
    editor.activate(link).unwrap();
    editor.set_id(link, "L").unwrap();
    editor.set_attribute_value(link, "NodeStart", "A").unwrap();
    Network {
        editor,
        network,
        node,
        link,
    }
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
