//! The indexed, immutable result of loading a schema.

use indexmap::{IndexMap, IndexSet};

use crate::diagnostics::SchemaDiagnostic;
use crate::error::SchemaError;
use crate::node::{NodeKind, SchemaNode, SchemaNodeId, SchemaNodes};

/// The three identity constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintCategory {
    Key,
    KeyRef,
    Unique,
}

/// A key, keyref or unique declaration found under the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintDef {
    pub category: ConstraintCategory,
    pub name: String,
    /// Path of the element declaring the constraint, e.g. `Ots.Network`.
    pub context: String,
    pub node: SchemaNodeId,
    /// Selector XPath with prefixes removed.
    pub selector: String,
    /// Field XPaths in declaration order.
    pub fields: Vec<String>,
    /// Name of the referred key, for keyrefs.
    pub refer: Option<String>,
}

impl ConstraintDef {
    pub fn full_path(&self) -> String {
        format!("{}.{}", self.context, self.name)
    }
}

/// Lookup tables over all loaded schema files.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    pub(crate) nodes: SchemaNodes,
    pub(crate) root: SchemaNodeId,
    pub(crate) root_name: String,
    pub(crate) read_files: IndexSet<String>,
    pub(crate) types: IndexMap<String, SchemaNodeId>,
    pub(crate) extended_types: IndexMap<String, IndexSet<String>>,
    pub(crate) referred_types: IndexMap<String, IndexSet<String>>,
    pub(crate) elements: IndexMap<String, SchemaNodeId>,
    pub(crate) referred_elements: IndexMap<String, IndexSet<String>>,
    pub(crate) documentation: IndexMap<String, String>,
    pub(crate) keys: IndexMap<String, ConstraintDef>,
    pub(crate) keyrefs: IndexMap<String, ConstraintDef>,
    pub(crate) uniques: IndexMap<String, ConstraintDef>,
    pub(crate) diagnostics: Vec<SchemaDiagnostic>,
}

impl SchemaIndex {
    // =========================================================================
    // Raw node access
    // =========================================================================

    pub fn nodes(&self) -> &SchemaNodes {
        &self.nodes
    }

    pub fn node(&self, id: SchemaNodeId) -> &SchemaNode {
        self.nodes.node(id)
    }

    pub fn kind(&self, id: SchemaNodeId) -> &NodeKind {
        self.nodes.kind(id)
    }

    pub fn attribute(&self, id: SchemaNodeId, name: &str) -> Option<&str> {
        self.nodes.attribute(id, name)
    }

    pub fn children(&self, id: SchemaNodeId) -> &[SchemaNodeId] {
        self.nodes.children(id)
    }

    pub fn child(&self, id: SchemaNodeId, kind: &NodeKind) -> Option<SchemaNodeId> {
        self.nodes.child(id, kind)
    }

    // =========================================================================
    // Index tables
    // =========================================================================

    /// The root element declaration.
    pub fn root(&self) -> SchemaNodeId {
        self.root
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn read_files(&self) -> &IndexSet<String> {
        &self.read_files
    }

    pub fn types(&self) -> &IndexMap<String, SchemaNodeId> {
        &self.types
    }

    pub fn elements(&self) -> &IndexMap<String, SchemaNodeId> {
        &self.elements
    }

    pub fn extended_types(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.extended_types
    }

    pub fn referred_types(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.referred_types
    }

    pub fn referred_elements(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.referred_elements
    }

    pub fn keys(&self) -> &IndexMap<String, ConstraintDef> {
        &self.keys
    }

    pub fn keyrefs(&self) -> &IndexMap<String, ConstraintDef> {
        &self.keyrefs
    }

    pub fn uniques(&self) -> &IndexMap<String, ConstraintDef> {
        &self.uniques
    }

    pub fn diagnostics(&self) -> &[SchemaDiagnostic] {
        &self.diagnostics
    }

    /// Element declaration (or, for typed elements, its type) at `path`.
    pub fn element(&self, path: &str) -> Option<SchemaNodeId> {
        self.elements.get(path).copied()
    }

    /// Named `complexType` or `simpleType`.
    pub fn type_def(&self, name: &str) -> Option<SchemaNodeId> {
        self.types.get(name).copied()
    }

    pub fn require_type(&self, name: &str) -> Result<SchemaNodeId, SchemaError> {
        self.type_def(name).ok_or_else(|| SchemaError::UndefinedType {
            name: name.to_string(),
        })
    }

    pub fn require_element(&self, path: &str) -> Result<SchemaNodeId, SchemaError> {
        self.element(path).ok_or_else(|| SchemaError::UndefinedElement {
            name: path.to_string(),
        })
    }

    /// Documentation string registered at exactly `path`.
    pub fn documentation(&self, path: &str) -> Option<&str> {
        self.documentation.get(path).map(String::as_str)
    }

    pub fn documentations(&self) -> &IndexMap<String, String> {
        &self.documentation
    }

    // =========================================================================
    // Derived queries
    // =========================================================================

    /// Text of the first `xsd:annotation/<kind>` child with the given
    /// `source` attribute, e.g. `annotation(node, &NodeKind::AppInfo, "name")`.
    pub fn annotation(&self, node: SchemaNodeId, kind: &NodeKind, source: &str) -> Option<String> {
        let annotation = self.child(node, &NodeKind::Annotation)?;
        self.nodes
            .children_of_kind(annotation, kind)
            .find(|child| self.attribute(*child, "source") == Some(source))
            .and_then(|child| self.node(child).text.as_deref())
            .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Whether `node` is of the named type `path`, either by name or through
    /// its `xsd:extension`/`xsd:restriction` base chain.
    pub fn is_type(&self, node: SchemaNodeId, path: &str) -> bool {
        self.is_type_inner(node, path, 0)
    }

    fn is_type_inner(&self, node: SchemaNodeId, path: &str, depth: usize) -> bool {
        if self.attribute(node, "name") == Some(path) {
            return true;
        }
        if depth > 64 {
            return false;
        }
        let node_use = if self.kind(node) == &NodeKind::Element {
            match self
                .child(node, &NodeKind::ComplexType)
                .or_else(|| self.child(node, &NodeKind::SimpleType))
            {
                Some(inner) => inner,
                None => return false,
            }
        } else {
            node
        };
        for child in self.children(node_use) {
            if !matches!(self.kind(*child), NodeKind::ComplexContent | NodeKind::SimpleContent) {
                continue;
            }
            let base = self
                .child(*child, &NodeKind::Restriction)
                .or_else(|| self.child(*child, &NodeKind::Extension))
                .and_then(|derivation| self.attribute(derivation, "base"));
            let Some(base) = base else { continue };
            if base.ends_with(path) {
                return true;
            }
            if !base.starts_with("xsd:")
                && let Some(base_node) = self.type_def(base)
                && base_node != node_use
            {
                return self.is_type_inner(base_node, path, depth + 1);
            }
        }
        false
    }

    /// Whether the element or complex type declares attribute `name`,
    /// directly, in a sequence, or through an extension base.
    pub fn has_element_attribute(&self, node: SchemaNodeId, name: &str) -> bool {
        let via = if self.kind(node) == &NodeKind::ComplexType {
            Some(node)
        } else {
            self.child(node, &NodeKind::ComplexType)
        };
        via.is_some_and(|via| self.declares_attribute(via, name, 0))
    }

    fn declares_attribute(&self, via: SchemaNodeId, name: &str, depth: usize) -> bool {
        if depth > 64 {
            return false;
        }
        for child in self.children(via) {
            match self.kind(*child) {
                NodeKind::Attribute if self.attribute(*child, "name") == Some(name) => return true,
                NodeKind::Sequence => {
                    if self.declares_attribute(*child, name, depth + 1) {
                        return true;
                    }
                }
                NodeKind::ComplexContent | NodeKind::SimpleContent => {
                    let Some(extension) = self.child(*child, &NodeKind::Extension) else {
                        continue;
                    };
                    if let Some(base) = self.attribute(extension, "base")
                        && let Some(base_node) = self.type_def(base)
                        && self.declares_attribute(base_node, name, depth + 1)
                    {
                        return true;
                    }
                    if self.declares_attribute(extension, name, depth + 1) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
}
