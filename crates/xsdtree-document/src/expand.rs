//! Projection of schema structure onto tree nodes.
//!
//! Element declarations become nodes, after following `ref` and `type`.
//! Sequences are flattened into the parent's children unless they repeat or
//! are an option of a choice. A choice or all becomes a choice node whose
//! first option stands in the child list. Extensions contribute their base
//! type's content before their own.

use std::sync::Arc;

use tracing::debug;
use xsdtree_schema::{NodeKind, SchemaError, SchemaNodeId, SchemaRef};

use crate::document::{NodeId, XsdTree};
use crate::error::TreeError;
use crate::event::{Origin, TreeEvent};

const MAX_BASE_DEPTH: usize = 32;

/// What a new tree node is made of.
#[derive(Debug, Clone)]
pub(crate) struct Blueprint {
    pub(crate) schema_node: SchemaRef,
    pub(crate) hidden: Vec<SchemaNodeId>,
    pub(crate) referring: Option<SchemaNodeId>,
}

impl Blueprint {
    pub(crate) fn plain(schema_node: SchemaNodeId, hidden: &[SchemaNodeId]) -> Self {
        Blueprint {
            schema_node: SchemaRef::Node(schema_node),
            hidden: hidden.to_vec(),
            referring: None,
        }
    }
}

impl XsdTree {
    /// Follows `ref` and `type` of an element declaration.
    pub(crate) fn resolve_element(
        &self,
        declaration: SchemaNodeId,
        hidden: &[SchemaNodeId],
    ) -> Result<Blueprint, SchemaError> {
        let schema = self.schema();
        let mut through = hidden.to_vec();
        through.push(declaration);
        if let Some(reference) = schema.attribute(declaration, "ref") {
            if reference == "xi:include" {
                return Ok(Blueprint {
                    schema_node: SchemaRef::XiInclude,
                    hidden: hidden.to_vec(),
                    referring: Some(declaration),
                });
            }
            // typed top-level elements are indexed by their type
            let referred = schema.require_element(reference)?;
            return Ok(Blueprint {
                schema_node: SchemaRef::Node(referred),
                hidden: through,
                referring: Some(declaration),
            });
        }
        if let Some(type_name) = schema.attribute(declaration, "type")
            && !type_name.starts_with("xsd:")
        {
            let type_node = schema.require_type(type_name)?;
            return Ok(Blueprint {
                schema_node: SchemaRef::Node(type_node),
                hidden: through,
                referring: Some(declaration),
            });
        }
        Ok(Blueprint::plain(declaration, hidden))
    }

    /// Schema nodes whose children become the children of a tree node shaped
    /// by `node`, each with the declarations passed on the way.
    pub(crate) fn relevant_nodes(
        &self,
        node: SchemaNodeId,
        hidden: &[SchemaNodeId],
        out: &mut Vec<(SchemaNodeId, Vec<SchemaNodeId>)>,
        depth: usize,
    ) -> Result<(), SchemaError> {
        let schema = self.schema();
        if depth > MAX_BASE_DEPTH {
            debug!(?node, "base type chain too deep");
            return Ok(());
        }
        let with = |extra: &[SchemaNodeId]| {
            let mut hidden = hidden.to_vec();
            hidden.extend_from_slice(extra);
            hidden
        };
        match schema.kind(node) {
            NodeKind::Element => {
                if let Some(complex_type) = schema.child(node, &NodeKind::ComplexType) {
                    self.relevant_nodes(complex_type, &with(&[node]), out, depth + 1)?;
                }
            }
            NodeKind::ComplexType => {
                let Some(content) = schema.child(node, &NodeKind::ComplexContent) else {
                    out.push((node, hidden.to_vec()));
                    return Ok(());
                };
                if let Some(extension) = schema.child(content, &NodeKind::Extension) {
                    if let Some(base) = schema.attribute(extension, "base")
                        && !base.starts_with("xsd:")
                    {
                        let base_node =
                            schema
                                .type_def(base)
                                .ok_or_else(|| SchemaError::UndefinedBase {
                                    name: base.to_string(),
                                })?;
                        self.relevant_nodes(
                            base_node,
                            &with(&[node, content, extension]),
                            out,
                            depth + 1,
                        )?;
                    }
                    out.push((extension, with(&[node, content])));
                } else if let Some(restriction) = schema.child(content, &NodeKind::Restriction) {
                    out.push((restriction, with(&[node, content])));
                }
            }
            NodeKind::Sequence
            | NodeKind::Choice
            | NodeKind::All
            | NodeKind::Extension
            | NodeKind::Restriction => out.push((node, hidden.to_vec())),
            _ => {}
        }
        Ok(())
    }

    /// Creates tree nodes for the children of `container` and appends them
    /// to `out`. With `flatten`, non-repeating sequences add their children
    /// directly instead of becoming a node.
    pub(crate) fn add_children(
        &mut self,
        container: SchemaNodeId,
        parent: NodeId,
        out: &mut Vec<NodeId>,
        hidden: &[SchemaNodeId],
        flatten: bool,
    ) -> Result<(), TreeError> {
        let schema = Arc::clone(self.schema_arc());
        for &child in schema.children(container) {
            match schema.kind(child) {
                NodeKind::Element => {
                    let blueprint = self.resolve_element(child, hidden)?;
                    out.push(self.create(Some(parent), blueprint));
                }
                NodeKind::Sequence if flatten && !repeats(&schema, child) => {
                    let mut hidden = hidden.to_vec();
                    hidden.push(child);
                    self.add_children(child, parent, out, &hidden, flatten)?;
                }
                NodeKind::Sequence => {
                    out.push(self.create(Some(parent), Blueprint::plain(child, hidden)));
                }
                NodeKind::Choice | NodeKind::All => {
                    let choice = self.create(Some(parent), Blueprint::plain(child, hidden));
                    self.create_options(choice)?;
                    if let Some(selected) = self.node(choice).selected {
                        out.push(selected);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Fills the options of a freshly created choice node and selects the
    /// first one. Options take the occurrence bounds of the choice.
    pub(crate) fn create_options(&mut self, choice: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(choice).ok_or(TreeError::Detached(choice))?;
        let Some(schema_node) = self.schema_node(choice) else {
            return Ok(());
        };
        let hidden = self.node(choice).hidden.clone();
        let mut options = Vec::new();
        self.add_children(schema_node, parent, &mut options, &hidden, false)?;
        let (min_occurs, max_occurs) = (self.min_occurs(choice), self.max_occurs(choice));
        for &option in &options {
            let node = self.node_mut(option);
            node.choice = Some(choice);
            node.min_occurs = min_occurs;
            node.max_occurs = max_occurs;
            node.active = false;
        }
        let node = self.node_mut(choice);
        node.choice = Some(choice);
        node.selected = options.first().copied();
        node.options = options.clone();
        if min_occurs > 0 {
            for option in options {
                self.set_active_inner(option, Origin::Cascade)?;
            }
        }
        Ok(())
    }

    /// Expands `id` once. Inactive nodes stay unexpanded.
    pub(crate) fn assure_children(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node(id);
        if node.children.is_some() || !node.active {
            return Ok(());
        }
        let schema_node = match node.schema_node {
            SchemaRef::XiInclude => {
                self.node_mut(id).children = Some(Vec::new());
                return self.expand_include(id);
            }
            SchemaRef::Node(schema_node) => schema_node,
        };
        let hidden = node.hidden.clone();
        let mut relevant = Vec::new();
        self.relevant_nodes(schema_node, &hidden, &mut relevant, 0)?;
        let mut children = Vec::new();
        for (container, hidden) in relevant {
            self.add_children(container, id, &mut children, &hidden, true)?;
        }
        debug!(path = %self.path_string(id), children = children.len(), "expanded node");
        for (index, &child) in children.iter().enumerate() {
            self.emit(
                Origin::Cascade,
                TreeEvent::NodeCreated {
                    node: child,
                    parent: id,
                    index,
                },
            );
        }
        self.node_mut(id).children = Some(children);

        // required repetitions
        let mut index = 0;
        while index < self.loaded_children(id).len() {
            let child = self.loaded_children(id)[index];
            for _ in 1..self.min_occurs(child) {
                self.add_inner(child, Origin::Cascade)?;
                index += 1;
            }
            index += 1;
        }
        Ok(())
    }

    /// Discards the children of `id` and expands it again.
    pub fn re_expand(&mut self, id: NodeId) -> Result<(), TreeError> {
        if let Some(children) = self.node_mut(id).children.take() {
            for (index, &child) in children.iter().enumerate().rev() {
                self.node_mut(child).parent = None;
                self.emit(
                    Origin::Cascade,
                    TreeEvent::NodeRemoved {
                        node: child,
                        parent: id,
                        index,
                    },
                );
            }
        }
        self.assure_children(id)
    }
}

fn repeats(schema: &xsdtree_schema::SchemaIndex, sequence: SchemaNodeId) -> bool {
    matches!(schema.attribute(sequence, "maxOccurs"), Some(max) if max != "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TreeOptions;
    use pretty_assertions::assert_eq;
    use xsdtree_schema::SchemaIndex;

    const SCHEMA: &str = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
      <xsd:element name="Root" type="RootType"/>
      <xsd:complexType name="BaseType">
        <xsd:sequence>
          <xsd:element name="First" type="xsd:string"/>
        </xsd:sequence>
      </xsd:complexType>
      <xsd:complexType name="RootType">
        <xsd:complexContent>
          <xsd:extension base="BaseType">
            <xsd:sequence>
              <xsd:choice>
                <xsd:element name="Left" type="xsd:string"/>
                <xsd:sequence>
                  <xsd:element name="Up" type="xsd:string"/>
                  <xsd:element name="Down" type="xsd:string"/>
                </xsd:sequence>
              </xsd:choice>
              <xsd:sequence maxOccurs="unbounded">
                <xsd:element name="Pair" type="xsd:string"/>
              </xsd:sequence>
              <xsd:element name="Last" type="xsd:string" minOccurs="2" maxOccurs="3"/>
            </xsd:sequence>
          </xsd:extension>
        </xsd:complexContent>
      </xsd:complexType>
    </xsd:schema>"#;

    fn expanded() -> (XsdTree, Vec<NodeId>) {
        let schema: SchemaIndex = SCHEMA.parse().unwrap();
        let mut tree = XsdTree::new(Arc::new(schema), TreeOptions::default()).unwrap();
        let root = tree.root();
        let children = tree.children(root).unwrap();
        (tree, children)
    }

    #[test]
    fn base_content_precedes_extension() {
        let (tree, children) = expanded();
        let names: Vec<_> = children.iter().map(|c| tree.node_name(*c)).collect();
        assert_eq!(names, ["First", "Left", "xsd:sequence", "Last", "Last"]);
    }

    #[test]
    fn choice_options_are_elements_or_sequences() {
        let (tree, children) = expanded();
        let left = children[1];
        let options: Vec<_> = tree.options_of(left).iter().map(|o| tree.node_name(*o)).collect();
        assert_eq!(options, ["Left", "xsd:sequence"]);
        assert_eq!(tree.selected_option(left), Some(left));
        assert!(tree.is_active(left));
        assert!(!tree.is_active(tree.options_of(left)[1]));
    }

    #[test]
    fn required_repeats_are_created() {
        let (tree, children) = expanded();
        assert_eq!(tree.min_occurs(children[3]), 2);
        assert!(tree.is_active(children[4]));
        assert_eq!(tree.path_string(children[4]), "Root.Last");
    }

    #[test]
    fn expansion_is_memoized() {
        let (mut tree, children) = expanded();
        let events = tree.take_events();
        assert!(events.iter().all(|record| !record.is_direct()));
        let again = tree.children(tree.root()).unwrap();
        assert_eq!(again, children);
        assert!(!tree.has_events());
    }

    #[test]
    fn re_expand_replaces_children() {
        let (mut tree, children) = expanded();
        tree.take_events();
        tree.re_expand(tree.root()).unwrap();
        let replaced = tree.loaded_children(tree.root()).to_vec();
        assert_eq!(replaced.len(), children.len());
        assert!(replaced.iter().all(|child| !children.contains(child)));
        let events = tree.take_events();
        let removed = events
            .iter()
            .filter(|r| matches!(r.event, TreeEvent::NodeRemoved { .. }))
            .count();
        assert_eq!(removed, children.len());
    }
}
