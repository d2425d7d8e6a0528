use std::sync::Arc;

use xsdtree_schema::{NodeKind, SchemaIndex, SchemaNodeId, SchemaRef, path};

use crate::error::TreeError;
use crate::event::{EventRecord, Origin, TreeEvent};
use crate::expand::Blueprint;
use crate::include::IncludeResolver;
use crate::node::{Attribute, TreeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Namespace written on save, e.g. prefix `ots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Attribute that makes a node identifiable.
    pub id_attribute: String,
    pub namespace: Option<Namespace>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        TreeOptions {
            id_attribute: "Id".to_string(),
            namespace: None,
        }
    }
}

/// A document being edited against a schema.
///
/// Nodes live in an arena and are never freed: a removed node is only
/// detached, so that it can be attached again by an undo.
#[derive(Debug)]
pub struct XsdTree {
    schema: Arc<SchemaIndex>,
    options: TreeOptions,
    pub(crate) nodes: Vec<TreeNode>,
    root: NodeId,
    events: Vec<EventRecord>,
    pub(crate) includes: Option<IncludeResolver>,
    pub(crate) schema_location: Option<String>,
}

impl XsdTree {
    /// Creates a tree holding only the active, unexpanded root node.
    pub fn new(schema: Arc<SchemaIndex>, options: TreeOptions) -> Result<Self, TreeError> {
        let mut tree = XsdTree {
            schema,
            options,
            nodes: Vec::new(),
            root: NodeId(0),
            events: Vec::new(),
            includes: None,
            schema_location: None,
        };
        let declaration = tree.schema.root();
        let blueprint = tree.resolve_element(declaration, &[])?;
        let root = tree.create(None, blueprint);
        let node = tree.node_mut(root);
        node.min_occurs = 1;
        node.max_occurs = Some(1);
        node.active = true;
        tree.root = root;
        Ok(tree)
    }

    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    pub fn schema_arc(&self) -> &Arc<SchemaIndex> {
        &self.schema
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_include_resolver(&mut self, resolver: IncludeResolver) {
        self.includes = Some(resolver);
    }

    pub fn include_resolver(&self) -> Option<&IncludeResolver> {
        self.includes.as_ref()
    }

    /// `xsi:schemaLocation` of the loaded document.
    pub fn schema_location(&self) -> Option<&str> {
        self.schema_location.as_deref()
    }

    pub fn set_schema_location(&mut self, location: Option<String>) {
        self.schema_location = location;
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub(crate) fn emit(&mut self, origin: Origin, event: TreeEvent) {
        self.events.push(EventRecord { event, origin });
    }

    // =========================================================================
    // Node state
    // =========================================================================

    pub(crate) fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children created so far. Empty for a node that was never expanded;
    /// use [`XsdTree::children`] to expand.
    pub fn loaded_children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children.as_deref().unwrap_or_default()
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.node(id).children.is_some()
    }

    /// Children of `id`, expanding it first if it is active.
    pub fn children(&mut self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.assure_children(id)?;
        Ok(self.loaded_children(id).to_vec())
    }

    /// Whether the node is part of the document: activated, and the
    /// selected option if it is a choice option.
    pub fn is_active(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.active
            && node
                .choice
                .is_none_or(|choice| self.node(choice).selected == Some(id))
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.node(id).value.as_deref()
    }

    pub fn schema_ref(&self, id: NodeId) -> SchemaRef {
        self.node(id).schema_node
    }

    /// The schema node this tree node is shaped by, `None` for `xi:include`.
    pub fn schema_node(&self, id: NodeId) -> Option<SchemaNodeId> {
        self.node(id).schema_node.node()
    }

    /// The element declaration that pointed to [`XsdTree::schema_node`]
    /// through `ref` or `type`.
    pub fn referring(&self, id: NodeId) -> Option<SchemaNodeId> {
        self.node(id).referring
    }

    pub fn min_occurs(&self, id: NodeId) -> usize {
        self.node(id).min_occurs
    }

    /// `None` is unbounded.
    pub fn max_occurs(&self, id: NodeId) -> Option<usize> {
        self.node(id).max_occurs
    }

    /// Dotted path such as `Ots.Network.Node`.
    pub fn path_string(&self, id: NodeId) -> &str {
        &self.node(id).path
    }

    /// Whether the node was loaded from an included file.
    pub fn is_included(&self, id: NodeId) -> bool {
        self.node(id).include
    }

    pub fn is_xi_include(&self, id: NodeId) -> bool {
        self.node(id).schema_node.is_include()
    }

    pub fn is_sequence(&self, id: NodeId) -> bool {
        self.schema_kind(id) == Some(&NodeKind::Sequence)
    }

    pub(crate) fn schema_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.schema_node(id).map(|node| self.schema.kind(node))
    }

    /// The choice node this node is an option of.
    pub fn choice(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).choice
    }

    /// Options of the choice `id` belongs to, empty if it is no option.
    pub fn options_of(&self, id: NodeId) -> &[NodeId] {
        match self.node(id).choice {
            Some(choice) => &self.node(choice).options,
            None => &[],
        }
    }

    /// Selected option of the choice `id` belongs to.
    pub fn selected_option(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).choice.and_then(|choice| self.node(choice).selected)
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        &self.node(id).attributes
    }

    pub fn attribute_count(&self, id: NodeId) -> usize {
        self.node(id).attributes.len()
    }

    pub fn attribute_index(&self, id: NodeId, name: &str) -> Option<usize> {
        if self.is_xi_include(id) && name == "href" {
            return Some(0);
        }
        self.node(id)
            .attributes
            .iter()
            .position(|attribute| attribute.name == name)
    }

    pub fn attribute_value(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute_index(id, name)
            .and_then(|index| self.attribute_value_at(id, index))
    }

    pub fn attribute_value_at(&self, id: NodeId, index: usize) -> Option<&str> {
        self.node(id)
            .attributes
            .get(index)
            .and_then(|attribute| attribute.value.as_deref())
    }

    /// Name of the element this node stands for, or the qualified name of
    /// the schema construct, e.g. `xsd:sequence`.
    pub fn node_name(&self, id: NodeId) -> String {
        let node = self.node(id);
        let declaration = match (node.referring, node.schema_node) {
            (Some(referring), _) => referring,
            (None, SchemaRef::Node(schema_node)) => schema_node,
            (None, SchemaRef::XiInclude) => return "xi:include".to_string(),
        };
        self.schema
            .attribute(declaration, "ref")
            .or_else(|| self.schema.attribute(declaration, "name"))
            .map(str::to_string)
            .unwrap_or_else(|| self.schema.kind(declaration).qualified_name())
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub(crate) fn push(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Creates an unattached node; the caller places it in a child or
    /// option list.
    pub(crate) fn create(&mut self, parent: Option<NodeId>, blueprint: Blueprint) -> NodeId {
        let occurs_source = blueprint.referring.or(blueprint.schema_node.node());
        let (min_occurs, max_occurs) = self.occurs(occurs_source);
        let value = occurs_source
            .and_then(|declaration| self.schema.attribute(declaration, "default"))
            .or_else(|| {
                blueprint
                    .schema_node
                    .node()
                    .and_then(|node| self.schema.attribute(node, "default"))
            })
            .map(str::to_string);
        let attributes = self.declared_attributes(blueprint.schema_node);
        let mut node = TreeNode::detached(blueprint.schema_node);
        node.parent = parent;
        node.hidden = blueprint.hidden;
        node.referring = blueprint.referring;
        node.min_occurs = min_occurs;
        node.max_occurs = max_occurs;
        node.active = min_occurs > 0;
        node.value = value;
        node.attributes = attributes;
        let id = self.push(node);
        let name = self.node_name(id);
        self.node_mut(id).path = self.build_path(parent, &name);
        id
    }

    /// `minOccurs` and `maxOccurs` of a declaration, `1` when absent.
    fn occurs(&self, declaration: Option<SchemaNodeId>) -> (usize, Option<usize>) {
        let Some(declaration) = declaration else {
            return (1, Some(1));
        };
        let min = self
            .schema
            .attribute(declaration, "minOccurs")
            .and_then(|min| min.parse().ok())
            .unwrap_or(1);
        let max = match self.schema.attribute(declaration, "maxOccurs") {
            Some("unbounded") => None,
            Some(max) => Some(max.parse().unwrap_or(1)),
            None => Some(1),
        };
        if self.schema.kind(declaration) == &NodeKind::All {
            // every element of an xsd:all may appear once, in any order
            let elements = self
                .schema
                .nodes()
                .children_of_kind(declaration, &NodeKind::Element)
                .count();
            return (min, max.map(|max| max * elements));
        }
        (min, max)
    }

    /// Attributes declared for a node, own declarations before those of
    /// extension bases.
    fn declared_attributes(&self, schema_node: SchemaRef) -> Vec<Attribute> {
        let SchemaRef::Node(node) = schema_node else {
            return ["File", "Fallback"]
                .into_iter()
                .map(|name| Attribute {
                    name: name.to_string(),
                    declaration: None,
                    value: None,
                })
                .collect();
        };
        let complex_type = if self.schema.kind(node) == &NodeKind::ComplexType {
            Some(node)
        } else {
            self.schema.child(node, &NodeKind::ComplexType)
        };
        let mut declarations = Vec::new();
        if let Some(complex_type) = complex_type {
            self.find_attributes(complex_type, &mut declarations, 0);
        }
        declarations
            .into_iter()
            .map(|declaration| Attribute {
                name: self
                    .schema
                    .attribute(declaration, "name")
                    .unwrap_or_default()
                    .to_string(),
                declaration: Some(declaration),
                value: None,
            })
            .collect()
    }

    fn find_attributes(&self, node: SchemaNodeId, out: &mut Vec<SchemaNodeId>, depth: usize) {
        if depth > 32 {
            return;
        }
        for &child in self.schema.children(node) {
            match self.schema.kind(child) {
                NodeKind::Attribute => {
                    let name = self.schema.attribute(child, "name");
                    let known = out
                        .iter()
                        .any(|seen| self.schema.attribute(*seen, "name") == name);
                    if name.is_some() && !known {
                        out.push(child);
                    }
                }
                NodeKind::ComplexContent | NodeKind::SimpleContent => {
                    let derivation = self
                        .schema
                        .child(child, &NodeKind::Extension)
                        .or_else(|| self.schema.child(child, &NodeKind::Restriction));
                    let Some(derivation) = derivation else { continue };
                    self.find_attributes(derivation, out, depth + 1);
                    if let Some(base) = self.schema.attribute(derivation, "base")
                        && let Some(base) = self.schema.type_def(base)
                    {
                        self.find_attributes(base, out, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }

    /// Path of a node named `name` under `parent`. Sequence, choice, all and
    /// include nodes only appear as the last path element.
    pub(crate) fn build_path(&self, parent: Option<NodeId>, name: &str) -> String {
        let Some(parent) = parent else {
            return name.to_string();
        };
        let parent_path = self.node(parent).path.as_str();
        let base = if is_structural(&self.node_name(parent)) {
            path::parent(parent_path)
        } else {
            parent_path
        };
        path::join(base, name)
    }
}

/// Names of nodes that do not add a level to the XML.
pub(crate) fn is_structural(name: &str) -> bool {
    matches!(
        name,
        "xsd:sequence" | "xsd:choice" | "xsd:all" | "xi:include"
    )
}
