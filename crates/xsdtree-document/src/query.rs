//! Read-only questions about nodes.

use xsdtree_schema::{NodeKind, SchemaNodeId, SchemaRef, is_expression};

use crate::document::{NodeId, XsdTree, is_structural};

const MAX_SHORT_STRING: usize = 64;

impl XsdTree {
    /// Index of `id` in its parent's children.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.loaded_children(parent).iter().position(|child| *child == id)
    }

    /// Whether `id` can be reached from the root through child lists.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while current != self.root() {
            if self.position(current).is_none() {
                return false;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        true
    }

    /// Nodes from the root down to `id`.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Nearest ancestor that is not a sequence, choice, all or include node.
    pub fn logical_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut parent = self.parent(id)?;
        while is_structural(&self.node_name(parent)) {
            parent = self.parent(parent)?;
        }
        Some(parent)
    }

    /// `id` and every loaded node below it, including the dormant options of
    /// choices.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if out.contains(&node) {
                continue;
            }
            out.push(node);
            if let Some(choice) = self.choice(node)
                && self.node(choice).selected == Some(node)
            {
                for option in self.options_of(node).iter().rev() {
                    if *option != node {
                        stack.push(*option);
                    }
                }
            }
            stack.extend(self.loaded_children(node).iter().rev());
        }
        out
    }

    /// Whether `a` and `b` are instances of the same schema declaration.
    pub fn same_type(&self, a: NodeId, b: NodeId) -> bool {
        let (a, b) = (self.node(a), self.node(b));
        a.schema_node == b.schema_node && a.referring == b.referring && a.hidden == b.hidden
    }

    /// Positions among the parent's children of nodes of the same type as
    /// `id`. For a choice option, any option of the choice counts.
    pub fn sibling_positions(&self, id: NodeId) -> Vec<usize> {
        let Some(parent) = self.parent(id) else {
            return Vec::new();
        };
        let options = self.options_of(id);
        self.loaded_children(parent)
            .iter()
            .enumerate()
            .filter(|(_, child)| {
                if options.is_empty() {
                    self.same_type(**child, id)
                } else {
                    options.iter().any(|option| self.same_type(**child, *option))
                }
            })
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_addable(&self, id: NodeId) -> bool {
        match self.max_occurs(id) {
            None => true,
            Some(max) => self.parent(id).is_some() && self.sibling_positions(id).len() < max,
        }
    }

    pub fn is_removable(&self, id: NodeId) -> bool {
        self.is_active(id) && self.sibling_positions(id).len() > self.min_occurs(id)
    }

    pub fn can_move_up(&self, id: NodeId) -> bool {
        let positions = self.sibling_positions(id);
        match (positions.first(), self.position(id)) {
            (Some(first), Some(position)) => position > *first,
            _ => false,
        }
    }

    pub fn can_move_down(&self, id: NodeId) -> bool {
        let positions = self.sibling_positions(id);
        match (positions.last(), self.position(id)) {
            (Some(last), Some(position)) => position < *last,
            _ => false,
        }
    }

    /// Whether the node holds a text value: simple types, complex types with
    /// simple content, and elements without a complex type.
    pub fn is_editable(&self, id: NodeId) -> bool {
        let SchemaRef::Node(node) = self.schema_ref(id) else {
            return false;
        };
        let schema = self.schema();
        let kind = schema.kind(node);
        if kind == &NodeKind::SimpleType || schema.child(node, &NodeKind::SimpleType).is_some() {
            return true;
        }
        let complex_type = if kind == &NodeKind::ComplexType {
            Some(node)
        } else {
            schema.child(node, &NodeKind::ComplexType)
        };
        if let Some(complex_type) = complex_type {
            return self.has_simple_content(complex_type, 0);
        }
        kind == &NodeKind::Element
            && schema
                .attribute(node, "type")
                .is_none_or(|type_name| type_name.starts_with("xsd:"))
    }

    fn has_simple_content(&self, complex_type: SchemaNodeId, depth: usize) -> bool {
        let schema = self.schema();
        if schema.child(complex_type, &NodeKind::SimpleContent).is_some() {
            return true;
        }
        if depth > 32 {
            return false;
        }
        let base = schema
            .child(complex_type, &NodeKind::ComplexContent)
            .and_then(|content| schema.child(content, &NodeKind::Extension))
            .and_then(|extension| schema.attribute(extension, "base"))
            .and_then(|base| schema.type_def(base));
        match base.map(|base| (base, schema.kind(base))) {
            Some((_, NodeKind::SimpleType)) => true,
            Some((base, NodeKind::ComplexType)) => self.has_simple_content(base, depth + 1),
            _ => false,
        }
    }

    /// Whether the node declares the identifying attribute.
    pub fn is_identifiable(&self, id: NodeId) -> bool {
        let attribute = &self.options().id_attribute;
        self.node(id).attributes.iter().any(|a| &a.name == attribute)
    }

    pub fn id(&self, id: NodeId) -> Option<&str> {
        self.attribute_value(id, &self.options().id_attribute)
    }

    /// Whether `id` is of type `path`: by its path string, by its parent
    /// chain for a dotted `path`, or by the schema type hierarchy.
    pub fn is_type(&self, id: NodeId, path: &str) -> bool {
        let path_string = self.path_string(id);
        if path_string == path || path_string.ends_with(&format!(".{path}")) {
            return true;
        }
        if let Some(dot) = path.rfind('.') {
            let Some(parent) = self.logical_parent(id) else {
                return false;
            };
            return self.is_type(id, &path[dot + 1..]) && self.is_type(parent, &path[..dot]);
        }
        let schema = self.schema();
        match self.schema_ref(id) {
            SchemaRef::Node(node) => {
                schema.is_type(node, path)
                    || self.referring(id).is_some_and(|referring| schema.is_type(referring, path))
            }
            SchemaRef::XiInclude => false,
        }
    }

    /// Whether `target` can take the content of `other`, as in paste.
    pub fn can_contain(&self, target: NodeId, other: NodeId) -> bool {
        if self.schema_ref(target) == self.schema_ref(other) {
            return true;
        }
        let schema = self.schema();
        match (self.referring(target), self.referring(other)) {
            (Some(a), Some(b)) => {
                let type_a = schema.attribute(a, "type");
                type_a.is_some() && type_a == schema.attribute(b, "type")
            }
            _ => false,
        }
    }

    /// First loaded child named `name`, looking through sequence nodes.
    pub fn first_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        for &child in self.loaded_children(id) {
            if self.node_name(child) == name {
                return Some(child);
            }
            if self.is_sequence(child)
                && let Some(found) = self.first_child(child, name)
            {
                return Some(found);
            }
        }
        None
    }

    /// Label for the node.
    ///
    /// A sequence is named by its `xsd:appinfo source="name"` annotation, or
    /// by the names of its children; an include is `Include`.
    pub fn short_string(&self, id: NodeId) -> String {
        if self.node(id).choice == Some(id) {
            let options: Vec<_> = self
                .node(id)
                .options
                .iter()
                .map(|option| self.short_string(*option))
                .collect();
            return format!("[{}]", options.join(", ")).to_lowercase();
        }
        if self.is_xi_include(id) {
            return "Include".to_string();
        }
        if let Some(node) = self.schema_node(id)
            && self.schema().kind(node) == &NodeKind::Sequence
        {
            if let Some(name) = self.schema().annotation(node, &NodeKind::AppInfo, "name") {
                return format!("{name}...");
            }
            let mut names: Vec<String> = Vec::new();
            let mut previous: Option<NodeId> = None;
            for &child in self.loaded_children(id) {
                if previous.is_some_and(|previous| self.same_type(previous, child)) {
                    continue;
                }
                names.push(self.short_string(child));
                previous = Some(child);
            }
            let joined = names.join(" | ");
            if joined.chars().count() > MAX_SHORT_STRING {
                let cut: String = joined.chars().take(MAX_SHORT_STRING - 2).collect();
                return format!("{cut}..");
            }
            return joined;
        }
        separated_name(&self.node_name(id))
    }

    /// Documentation of the node, the declaration that referred to it
    /// taking precedence over the type.
    pub fn description(&self, id: NodeId) -> Option<String> {
        let schema = self.schema();
        self.referring(id)
            .and_then(|referring| {
                schema.annotation(referring, &NodeKind::Documentation, "description")
            })
            .or_else(|| {
                self.schema_node(id).and_then(|node| {
                    schema.annotation(node, &NodeKind::Documentation, "description")
                })
            })
            .or_else(|| schema.documentation(self.path_string(id)).map(str::to_string))
    }

    pub fn attribute_description(&self, id: NodeId, index: usize) -> Option<String> {
        let declaration = self.attributes(id).get(index)?.declaration?;
        self.schema()
            .annotation(declaration, &NodeKind::Documentation, "description")
    }

    pub fn default_attribute_value(&self, id: NodeId, index: usize) -> Option<&str> {
        let declaration = self.attributes(id).get(index)?.declaration?;
        self.schema().attribute(declaration, "default")
    }

    pub fn value_is_expression(&self, id: NodeId) -> bool {
        self.value(id).is_some_and(is_expression)
    }

    pub fn attribute_is_expression(&self, id: NodeId, index: usize) -> bool {
        self.attribute_value_at(id, index).is_some_and(is_expression)
    }

    /// Built-in type of the node's value, e.g. `xsd:double`.
    pub fn value_base_type(&self, id: NodeId) -> Option<String> {
        self.schema_node(id).and_then(|node| self.schema().base_type(node))
    }

    pub fn attribute_base_type(&self, id: NodeId, index: usize) -> Option<String> {
        if self.is_xi_include(id) {
            return Some("xsd:anyURI".to_string());
        }
        let declaration = self.attributes(id).get(index)?.declaration?;
        self.schema().base_type(declaration)
    }

    /// Values the schema allows for the node's value, empty when free.
    pub fn value_restrictions(&self, id: NodeId) -> Vec<String> {
        self.schema_node(id)
            .map(|node| self.schema().restrictions(node).options())
            .unwrap_or_default()
    }

    pub fn attribute_restrictions(&self, id: NodeId, index: usize) -> Vec<String> {
        self.attributes(id)
            .get(index)
            .and_then(|attribute| attribute.declaration)
            .map(|declaration| self.schema().restrictions(declaration).options())
            .unwrap_or_default()
    }

    /// Schema check of the value of an active, editable node.
    pub fn schema_value_message(&self, id: NodeId) -> Option<String> {
        if !self.is_active(id) || !self.is_editable(id) {
            return None;
        }
        let node = self.schema_node(id)?;
        let declaration = self.referring(id).unwrap_or(node);
        self.schema()
            .report_invalid_value(node, self.value(id))
            .or_else(|| {
                (declaration != node)
                    .then(|| self.schema().report_invalid_value(declaration, self.value(id)))
                    .flatten()
            })
    }

    /// Schema check of an attribute of an active node.
    pub fn schema_attribute_message(&self, id: NodeId, index: usize) -> Option<String> {
        if !self.is_active(id) {
            return None;
        }
        let attribute = self.attributes(id).get(index)?;
        let declaration = attribute.declaration?;
        self.schema()
            .report_invalid_attribute_value(declaration, attribute.value.as_deref())
    }
}

/// `GtuType` becomes `Gtu type`.
pub(crate) fn separated_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && previous_lower {
            out.push(' ');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    out
}
