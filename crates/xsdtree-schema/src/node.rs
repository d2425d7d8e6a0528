//! Arena representation of parsed XSD documents.
//!
//! Every XSD element becomes a [`SchemaNode`] addressed by a [`SchemaNodeId`].
//! Nodes keep their attributes with QName values already normalized (see
//! [`crate::parse`]), so `type="ots:Foo"` is stored as `Foo` and
//! `type="xs:string"` as `xsd:string`.

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaNodeId(pub usize);

/// Reference from a tree node to the schema construct that shapes it.
///
/// `xi:include` is not part of any schema file, so it has its own case
/// instead of pointing at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaRef {
    Node(SchemaNodeId),
    XiInclude,
}

impl SchemaRef {
    pub fn node(self) -> Option<SchemaNodeId> {
        match self {
            SchemaRef::Node(id) => Some(id),
            SchemaRef::XiInclude => None,
        }
    }

    pub fn is_include(self) -> bool {
        matches!(self, SchemaRef::XiInclude)
    }
}

impl From<SchemaNodeId> for SchemaRef {
    fn from(id: SchemaNodeId) -> Self {
        SchemaRef::Node(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Enumeration,
    Pattern,
    MinInclusive,
    MaxInclusive,
    MinExclusive,
    MaxExclusive,
    Length,
    MinLength,
    MaxLength,
    WhiteSpace,
    TotalDigits,
    FractionDigits,
}

impl Facet {
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "enumeration" => Facet::Enumeration,
            "pattern" => Facet::Pattern,
            "minInclusive" => Facet::MinInclusive,
            "maxInclusive" => Facet::MaxInclusive,
            "minExclusive" => Facet::MinExclusive,
            "maxExclusive" => Facet::MaxExclusive,
            "length" => Facet::Length,
            "minLength" => Facet::MinLength,
            "maxLength" => Facet::MaxLength,
            "whiteSpace" => Facet::WhiteSpace,
            "totalDigits" => Facet::TotalDigits,
            "fractionDigits" => Facet::FractionDigits,
            _ => return None,
        })
    }

    pub fn local_name(self) -> &'static str {
        match self {
            Facet::Enumeration => "enumeration",
            Facet::Pattern => "pattern",
            Facet::MinInclusive => "minInclusive",
            Facet::MaxInclusive => "maxInclusive",
            Facet::MinExclusive => "minExclusive",
            Facet::MaxExclusive => "maxExclusive",
            Facet::Length => "length",
            Facet::MinLength => "minLength",
            Facet::MaxLength => "maxLength",
            Facet::WhiteSpace => "whiteSpace",
            Facet::TotalDigits => "totalDigits",
            Facet::FractionDigits => "fractionDigits",
        }
    }
}

/// The construct a schema node represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of a parsed file; its only child is the `xsd:schema` element.
    Document,
    Schema,
    Include,
    Import,
    Element,
    Attribute,
    AttributeGroup,
    Group,
    ComplexType,
    SimpleType,
    Sequence,
    Choice,
    All,
    Any,
    ComplexContent,
    SimpleContent,
    Extension,
    Restriction,
    Union,
    List,
    Annotation,
    Documentation,
    AppInfo,
    Key,
    Keyref,
    Unique,
    Selector,
    Field,
    Facet(Facet),
    /// Any other element in the XSD namespace, by local name.
    Other(String),
    /// An element outside the XSD namespace (e.g. inside `xsd:appinfo`).
    Foreign(String),
}

impl NodeKind {
    pub fn from_xsd_local_name(name: &str) -> Self {
        match name {
            "schema" => NodeKind::Schema,
            "include" => NodeKind::Include,
            "import" => NodeKind::Import,
            "element" => NodeKind::Element,
            "attribute" => NodeKind::Attribute,
            "attributeGroup" => NodeKind::AttributeGroup,
            "group" => NodeKind::Group,
            "complexType" => NodeKind::ComplexType,
            "simpleType" => NodeKind::SimpleType,
            "sequence" => NodeKind::Sequence,
            "choice" => NodeKind::Choice,
            "all" => NodeKind::All,
            "any" => NodeKind::Any,
            "complexContent" => NodeKind::ComplexContent,
            "simpleContent" => NodeKind::SimpleContent,
            "extension" => NodeKind::Extension,
            "restriction" => NodeKind::Restriction,
            "union" => NodeKind::Union,
            "list" => NodeKind::List,
            "annotation" => NodeKind::Annotation,
            "documentation" => NodeKind::Documentation,
            "appinfo" => NodeKind::AppInfo,
            "key" => NodeKind::Key,
            "keyref" => NodeKind::Keyref,
            "unique" => NodeKind::Unique,
            "selector" => NodeKind::Selector,
            "field" => NodeKind::Field,
            other => match Facet::from_local_name(other) {
                Some(facet) => NodeKind::Facet(facet),
                None => NodeKind::Other(other.to_string()),
            },
        }
    }

    /// Qualified name as used in paths and log output, e.g. `xsd:sequence`.
    pub fn qualified_name(&self) -> String {
        let local = match self {
            NodeKind::Document => return "#document".to_string(),
            NodeKind::Foreign(name) => return name.clone(),
            NodeKind::Other(name) => name.as_str(),
            NodeKind::Facet(facet) => facet.local_name(),
            NodeKind::Schema => "schema",
            NodeKind::Include => "include",
            NodeKind::Import => "import",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::AttributeGroup => "attributeGroup",
            NodeKind::Group => "group",
            NodeKind::ComplexType => "complexType",
            NodeKind::SimpleType => "simpleType",
            NodeKind::Sequence => "sequence",
            NodeKind::Choice => "choice",
            NodeKind::All => "all",
            NodeKind::Any => "any",
            NodeKind::ComplexContent => "complexContent",
            NodeKind::SimpleContent => "simpleContent",
            NodeKind::Extension => "extension",
            NodeKind::Restriction => "restriction",
            NodeKind::Union => "union",
            NodeKind::List => "list",
            NodeKind::Annotation => "annotation",
            NodeKind::Documentation => "documentation",
            NodeKind::AppInfo => "appinfo",
            NodeKind::Key => "key",
            NodeKind::Keyref => "keyref",
            NodeKind::Unique => "unique",
            NodeKind::Selector => "selector",
            NodeKind::Field => "field",
        };
        format!("xsd:{local}")
    }

    pub fn is_type_definition(&self) -> bool {
        matches!(self, NodeKind::ComplexType | NodeKind::SimpleType)
    }

    /// Model groups that become choice nodes in a tree.
    pub fn is_choice_like(&self) -> bool {
        matches!(self, NodeKind::Choice | NodeKind::All)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<SchemaNodeId>,
    pub parent: Option<SchemaNodeId>,
    /// Concatenated direct text content, if any.
    pub text: Option<String>,
    /// Index into [`SchemaNodes::files`] of the file this node was read from.
    pub file: usize,
}

impl SchemaNode {
    pub fn new(kind: NodeKind, file: usize) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            children: Vec::new(),
            parent: None,
            text: None,
            file,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.attribute("name")
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }
}

/// Storage for all nodes of all loaded schema files.
#[derive(Debug, Clone, Default)]
pub struct SchemaNodes {
    nodes: Vec<SchemaNode>,
    files: Vec<String>,
}

impl SchemaNodes {
    pub fn add_file(&mut self, location: impl Into<String>) -> usize {
        self.files.push(location.into());
        self.files.len() - 1
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn create(&mut self, node: SchemaNode) -> SchemaNodeId {
        self.nodes.push(node);
        SchemaNodeId(self.nodes.len() - 1)
    }

    /// Creates a node and appends it to `parent`'s children.
    pub fn create_child(&mut self, parent: SchemaNodeId, mut node: SchemaNode) -> SchemaNodeId {
        node.parent = Some(parent);
        let id = self.create(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: SchemaNodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: SchemaNodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Location of the file the node was read from.
    pub fn file_of(&self, id: SchemaNodeId) -> &str {
        &self.files[self.node(id).file]
    }

    pub fn kind(&self, id: SchemaNodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn attribute(&self, id: SchemaNodeId, name: &str) -> Option<&str> {
        self.node(id).attribute(name)
    }

    pub fn children(&self, id: SchemaNodeId) -> &[SchemaNodeId] {
        &self.node(id).children
    }

    /// First child of the given kind.
    pub fn child(&self, id: SchemaNodeId, kind: &NodeKind) -> Option<SchemaNodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == kind)
    }

    pub fn children_of_kind<'a>(
        &'a self,
        id: SchemaNodeId,
        kind: &'a NodeKind,
    ) -> impl Iterator<Item = SchemaNodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.kind(*child) == kind)
    }
}
