use xsdtree_schema::{SchemaNodeId, SchemaRef};

use crate::document::NodeId;

/// An attribute slot of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// The `xsd:attribute` declaration. `None` for the `File` and `Fallback`
    /// attributes of an `xi:include` node.
    pub declaration: Option<SchemaNodeId>,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct TreeNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) schema_node: SchemaRef,
    /// Declarations passed on the way to `schema_node`, e.g. the element
    /// that named the type.
    pub(crate) hidden: Vec<SchemaNodeId>,
    /// Element declaration carrying `ref` or `type`, when `schema_node` is
    /// what it points to.
    pub(crate) referring: Option<SchemaNodeId>,
    pub(crate) min_occurs: usize,
    /// `None` is unbounded.
    pub(crate) max_occurs: Option<usize>,
    pub(crate) path: String,
    /// Choice node this node is an option of. A choice node is its own choice.
    pub(crate) choice: Option<NodeId>,
    pub(crate) options: Vec<NodeId>,
    pub(crate) selected: Option<NodeId>,
    /// `None` until expanded.
    pub(crate) children: Option<Vec<NodeId>>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) active: bool,
    /// Set once deactivated, so that reactivation restores instead of
    /// expanding again.
    pub(crate) deactivated: bool,
    pub(crate) value: Option<String>,
    /// Loaded from an included file.
    pub(crate) include: bool,
}

impl TreeNode {
    pub(crate) fn detached(schema_node: SchemaRef) -> Self {
        TreeNode {
            parent: None,
            schema_node,
            hidden: Vec::new(),
            referring: None,
            min_occurs: 1,
            max_occurs: Some(1),
            path: String::new(),
            choice: None,
            options: Vec::new(),
            selected: None,
            children: None,
            attributes: Vec::new(),
            active: false,
            deactivated: false,
            value: None,
            include: false,
        }
    }
}

/// The content of a node, captured before it is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub(crate) value: Option<String>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) children: Option<Vec<NodeId>>,
    pub(crate) active: bool,
    pub(crate) deactivated: bool,
}

impl NodeSnapshot {
    /// Children at the time of the snapshot, if the node was expanded.
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or_default()
    }
}
