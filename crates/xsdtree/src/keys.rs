//! Identity constraints: `xsd:key`, `xsd:keyref` and `xsd:unique`.
//!
//! One [`KeyValidator`] per declaration tracks the tree nodes its selector
//! picks. Its fields are gathered from each node as attributes (`@Id`),
//! values of child elements (`Name`) and the node's own value (`.`), in that
//! order. A key or unique requires distinct field values among the nodes in
//! the same context, the nearest ancestor at the declaring element's path.
//! A keyref requires its values to equal those of some node of the key it
//! refers to.

use ahash::AHashMap;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};
use xsdtree_document::{EventRecord, NodeId, TreeEvent, XsdTree};
use xsdtree_schema::{ConstraintCategory, ConstraintDef, SchemaIndex, is_expression, path};

type Values = Vec<Option<String>>;

/// Validator of one identity constraint.
#[derive(Debug)]
pub struct KeyValidator {
    def: ConstraintDef,
    attributes: Vec<String>,
    children: Vec<String>,
    self_value: bool,
    /// Selector alternatives as dotted paths, e.g. `Network.Node`.
    types: Vec<String>,
    /// Index of the referred key among the validators.
    refer: Option<usize>,
    nodes: IndexSet<NodeId>,
    messages: AHashMap<NodeId, String>,
    /// Keyref node to the key node holding the same values.
    couplings: IndexMap<NodeId, NodeId>,
}

impl KeyValidator {
    fn new(def: ConstraintDef, refer: Option<usize>) -> Self {
        let mut attributes = Vec::new();
        let mut children = Vec::new();
        let mut self_value = false;
        for field in &def.fields {
            if let Some(attribute) = field.strip_prefix('@') {
                attributes.push(attribute.to_string());
            } else if field == "." {
                self_value = true;
            } else if field.contains(['/', '@', '*']) {
                warn!(constraint = %def.name, %field, "unsupported field, it is not checked");
            } else {
                children.push(field.clone());
            }
        }
        let types = def
            .selector
            .replace(".//", "")
            .replace('/', ".")
            .split('|')
            .map(|alternative| alternative.trim().to_string())
            .filter(|alternative| !alternative.is_empty())
            .collect();
        KeyValidator {
            def,
            attributes,
            children,
            self_value,
            types,
            refer,
            nodes: IndexSet::new(),
            messages: AHashMap::new(),
            couplings: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn category(&self) -> ConstraintCategory {
        self.def.category
    }

    /// Path of the element declaring the constraint.
    pub fn context_path(&self) -> &str {
        &self.def.context
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Whether the selector picks `node`.
    pub fn selects(&self, tree: &XsdTree, node: NodeId) -> bool {
        let root_context = !self.def.context.contains('.');
        self.types.iter().any(|selected| {
            if root_context {
                tree.is_type(node, selected)
            } else {
                tree.is_type(node, &path::join(&self.def.context, selected))
            }
        })
    }

    /// Nearest node at or above `node` whose path ends in the declaring path.
    pub fn context(&self, tree: &XsdTree, node: NodeId) -> Option<NodeId> {
        tree.ancestry(node)
            .into_iter()
            .rev()
            .find(|ancestor| tree.path_string(*ancestor).ends_with(self.def.context.as_str()))
    }

    fn track(&mut self, tree: &XsdTree, node: NodeId) {
        if self.selects(tree, node) {
            self.nodes.insert(node);
        }
    }

    fn untrack(&mut self, node: NodeId) {
        self.nodes.shift_remove(&node);
        self.messages.remove(&node);
        self.couplings.shift_remove(&node);
    }

    fn uses_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attribute| attribute == name)
    }

    fn uses_value_of(&self, tree: &XsdTree, node: NodeId) -> bool {
        self.self_value || self.children.contains(&tree.node_name(node))
    }

    fn field_count(&self) -> usize {
        self.attributes.len() + self.children.len() + usize::from(self.self_value)
    }

    fn field_name(&self, index: usize) -> String {
        let children = self.attributes.len() + self.children.len();
        if index < self.attributes.len() {
            self.attributes[index].clone()
        } else if index < children {
            self.children[index - self.attributes.len()].clone()
        } else {
            "Value".to_string()
        }
    }

    /// Index of a field by attribute or child name; anything else is the
    /// node's own value.
    fn field_index(&self, field: &str) -> usize {
        if let Some(index) = self.attributes.iter().position(|a| a == field) {
            return index;
        }
        match self.children.iter().position(|c| c == field) {
            Some(index) => self.attributes.len() + index,
            None => self.attributes.len() + self.children.len(),
        }
    }

    /// Field values of `node`, empty values as `None`.
    fn gather(&self, tree: &XsdTree, node: NodeId) -> Values {
        let mut values = Vec::with_capacity(self.field_count());
        for attribute in &self.attributes {
            values.push(tree.attribute_value(node, attribute).map(str::to_string));
        }
        for child in &self.children {
            let value = tree
                .first_child(node, child)
                .filter(|child| tree.is_active(*child))
                .and_then(|child| tree.value(child));
            values.push(value.map(str::to_string));
        }
        if self.self_value {
            values.push(tree.value(node).map(str::to_string));
        }
        for value in &mut values {
            if value.as_deref() == Some("") {
                *value = None;
            }
        }
        values
    }

    /// Tracked nodes that are part of the document, with their values.
    fn live_values(&self, tree: &XsdTree) -> Vec<(NodeId, Option<NodeId>, Values)> {
        self.nodes
            .iter()
            .filter(|node| is_live(tree, **node))
            .map(|node| (*node, self.context(tree, *node), self.gather(tree, *node)))
            .collect()
    }

    fn type_string(&self) -> String {
        match self.types.as_slice() {
            [single] => single.clone(),
            types => format!("[{}]", types.join(", ")),
        }
    }

    fn validate_key(&mut self, tree: &XsdTree) {
        self.messages.clear();
        let live = self.live_values(tree);
        let mut counts: AHashMap<(Option<NodeId>, &Values), usize> = AHashMap::new();
        for (_, context, values) in &live {
            *counts.entry((*context, values)).or_default() += 1;
        }
        let mut messages = Vec::new();
        for (node, context, values) in &live {
            let message = if self.def.category == ConstraintCategory::Key && values.contains(&None) {
                let missing: Vec<String> = values
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| value.is_none())
                    .map(|(index, _)| self.field_name(index))
                    .collect();
                match missing.as_slice() {
                    [single] => format!("Insufficient number of values, missing {single}."),
                    _ => format!("Insufficient number of values, missing [{}].", missing.join(", ")),
                }
            } else if values.iter().all(Option::is_none) {
                continue;
            } else if counts.get(&(*context, values)).copied().unwrap_or(0) > 1 {
                if let [value] = values.as_slice() {
                    format!(
                        "Value {} for {} is not unique within {}.",
                        value.as_deref().unwrap_or_default(),
                        self.field_name(0),
                        self.def.context
                    )
                } else {
                    format!(
                        "Values [{}] are not unique within {}.",
                        join_values(values),
                        self.def.context
                    )
                }
            } else {
                continue;
            };
            messages.push((*node, message));
        }
        self.messages.extend(messages);
    }

    /// Key nodes, with values, that a keyref at `node` may refer to.
    fn candidates(&self, key: &KeyValidator, tree: &XsdTree, node: NodeId) -> Vec<(NodeId, Values)> {
        let live = key.live_values(tree);
        match key.context(tree, node) {
            Some(context) => live
                .into_iter()
                .filter(|(_, key_context, _)| *key_context == Some(context))
                .map(|(node, _, values)| (node, values))
                .collect(),
            None => {
                // the key is declared deeper than the keyref
                let scope = self.context(tree, node);
                live.into_iter()
                    .filter(|(key_node, _, _)| {
                        scope.is_none_or(|scope| tree.ancestry(*key_node).contains(&scope))
                    })
                    .map(|(node, _, values)| (node, values))
                    .collect()
            }
        }
    }

    fn validate_keyref(&mut self, key: &KeyValidator, tree: &XsdTree) {
        self.messages.clear();
        self.couplings.clear();
        let live = self.live_values(tree);
        for (node, _, values) in live {
            if values.iter().all(Option::is_none)
                || values.iter().flatten().any(|value| is_expression(value))
            {
                continue;
            }
            let matched = if values.contains(&None) {
                None
            } else {
                self.candidates(key, tree, node)
                    .into_iter()
                    .find(|(_, key_values)| *key_values == values)
                    .map(|(key_node, _)| key_node)
            };
            if let Some(key_node) = matched {
                self.couplings.insert(node, key_node);
                continue;
            }
            let message = if let [value] = values.as_slice() {
                let name = self
                    .attributes
                    .first()
                    .or(self.children.first())
                    .cloned()
                    .unwrap_or_else(|| tree.node_name(node));
                format!(
                    "Value {} for {} does not refer to a known {} within {}.",
                    value.as_deref().unwrap_or_default(),
                    name,
                    key.type_string(),
                    self.def.context
                )
            } else {
                format!(
                    "Values [{}] do not refer to a known {} within {}.",
                    join_values(&values),
                    key.type_string(),
                    self.def.context
                )
            };
            self.messages.insert(node, message);
        }
    }

    /// Values a keyref field at `node` may take: those of the referred key
    /// in its context. `None` when the context of the key is ambiguous.
    fn options(&self, key: &KeyValidator, tree: &XsdTree, node: NodeId, field: &str) -> Option<Vec<String>> {
        let index = self.field_index(field);
        let key_nodes: Vec<NodeId> = match key.context(tree, node) {
            Some(context) => key
                .live_values(tree)
                .into_iter()
                .filter(|(_, key_context, _)| *key_context == Some(context))
                .map(|(node, _, _)| node)
                .collect(),
            None => {
                let scope = self.context(tree, node)?;
                let scopes: Vec<NodeId> = tree
                    .subtree(scope)
                    .into_iter()
                    .filter(|candidate| {
                        is_live(tree, *candidate)
                            && tree.path_string(*candidate).ends_with(key.def.context.as_str())
                    })
                    .collect();
                let [only] = scopes.as_slice() else {
                    debug!(constraint = %self.def.name, "no unique scope for options");
                    return None;
                };
                key.live_values(tree)
                    .into_iter()
                    .filter(|(_, key_context, _)| *key_context == Some(*only))
                    .map(|(node, _, _)| node)
                    .collect()
            }
        };
        let mut options: IndexSet<String> = IndexSet::new();
        for key_node in key_nodes {
            if let Some(Some(value)) = key.gather(tree, key_node).get(index)
                && !value.trim().is_empty()
            {
                options.insert(value.clone());
            }
        }
        Some(options.into_iter().collect())
    }

    /// The tracked node whose message covers the value of `node`: the node
    /// itself for `.`, its parent for child fields.
    fn value_owner(&self, tree: &XsdTree, node: NodeId) -> Option<NodeId> {
        if self.self_value && self.nodes.contains(&node) {
            return Some(node);
        }
        if self.children.contains(&tree.node_name(node)) {
            return tree
                .logical_parent(node)
                .filter(|parent| self.nodes.contains(parent));
        }
        None
    }
}

fn join_values(values: &[Option<String>]) -> String {
    values
        .iter()
        .map(|value| value.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether `node` is part of the document: attached and active up to the
/// root.
fn is_live(tree: &XsdTree, node: NodeId) -> bool {
    tree.is_attached(node)
        && tree
            .ancestry(node)
            .into_iter()
            .all(|ancestor| tree.is_active(ancestor))
}

/// All identity constraints of a schema, kept up to date with the tree.
#[derive(Debug, Default)]
pub struct KeyValidators {
    validators: Vec<KeyValidator>,
}

impl KeyValidators {
    /// Keys and uniques first, then keyrefs linked to the key they refer to
    /// by name.
    pub fn new(schema: &SchemaIndex) -> Self {
        let mut validators: Vec<KeyValidator> = schema
            .keys()
            .values()
            .chain(schema.uniques().values())
            .map(|def| KeyValidator::new(def.clone(), None))
            .collect();
        for def in schema.keyrefs().values() {
            let refer = def.refer.as_deref().and_then(|refer| {
                validators
                    .iter()
                    .position(|validator| validator.refer.is_none() && validator.def.name == refer)
            });
            match refer {
                Some(refer) => validators.push(KeyValidator::new(def.clone(), Some(refer))),
                None => warn!(keyref = %def.name, refer = ?def.refer, "keyref refers to an unknown key, it is not checked"),
            }
        }
        KeyValidators { validators }
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValidator> {
        self.validators.iter()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Follows the events: tracks created nodes, forgets removed ones and
    /// validates again where values may have changed.
    pub fn update(&mut self, tree: &XsdTree, events: &[EventRecord]) {
        let mut dirty = vec![false; self.validators.len()];
        for record in events {
            match &record.event {
                TreeEvent::NodeCreated { node, .. } => {
                    for id in tree.subtree(*node) {
                        self.validators.iter_mut().for_each(|v| v.track(tree, id));
                    }
                    dirty.fill(true);
                }
                TreeEvent::NodeRemoved { node, .. } => {
                    for id in tree.subtree(*node) {
                        self.validators.iter_mut().for_each(|v| v.untrack(id));
                    }
                    dirty.fill(true);
                }
                TreeEvent::Replaced { node, previous } => {
                    for child in previous.children() {
                        if !tree.is_attached(*child) {
                            for id in tree.subtree(*child) {
                                self.validators.iter_mut().for_each(|v| v.untrack(id));
                            }
                        }
                    }
                    for id in tree.subtree(*node) {
                        self.validators.iter_mut().for_each(|v| v.track(tree, id));
                    }
                    dirty.fill(true);
                }
                TreeEvent::OptionChanged { selected, .. } => {
                    for id in tree.subtree(*selected) {
                        self.validators.iter_mut().for_each(|v| v.track(tree, id));
                    }
                    dirty.fill(true);
                }
                TreeEvent::ActivationChanged { .. } | TreeEvent::Moved { .. } => dirty.fill(true),
                TreeEvent::ValueChanged { node, .. } => {
                    for (index, validator) in self.validators.iter().enumerate() {
                        dirty[index] |= validator.uses_value_of(tree, *node);
                    }
                }
                TreeEvent::AttributeChanged { attribute, .. } => {
                    for (index, validator) in self.validators.iter().enumerate() {
                        dirty[index] |= validator.uses_attribute(attribute);
                    }
                }
            }
        }
        for index in 0..self.validators.len() {
            if let Some(refer) = self.validators[index].refer {
                dirty[index] |= dirty[refer];
            }
        }
        for index in 0..self.validators.len() {
            if dirty[index] && self.validators[index].refer.is_none() {
                self.validators[index].validate_key(tree);
            }
        }
        for index in 0..self.validators.len() {
            let Some(refer) = self.validators[index].refer else {
                continue;
            };
            if !dirty[index] {
                continue;
            }
            // keyrefs come after all keys
            let (keys, keyrefs) = self.validators.split_at_mut(index);
            keyrefs[0].validate_keyref(&keys[refer], tree);
        }
    }

    /// First constraint message about attribute `name` of `node`.
    pub fn attribute_message(&self, node: NodeId, name: &str) -> Option<&str> {
        self.validators
            .iter()
            .filter(|validator| validator.uses_attribute(name))
            .find_map(|validator| validator.messages.get(&node))
            .map(String::as_str)
    }

    /// First constraint message about the value of `node`.
    pub fn value_message(&self, tree: &XsdTree, node: NodeId) -> Option<&str> {
        self.validators
            .iter()
            .find_map(|validator| {
                let owner = validator.value_owner(tree, node)?;
                validator.messages.get(&owner)
            })
            .map(String::as_str)
    }

    /// Key node that attribute `name` of keyref node `node` refers to.
    pub fn coupled_attribute(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.validators
            .iter()
            .filter(|validator| validator.refer.is_some() && validator.uses_attribute(name))
            .find_map(|validator| validator.couplings.get(&node).copied())
    }

    /// Key node that the value of keyref node `node` refers to.
    pub fn coupled_value(&self, tree: &XsdTree, node: NodeId) -> Option<NodeId> {
        self.validators
            .iter()
            .filter(|validator| validator.refer.is_some())
            .find_map(|validator| {
                let owner = validator.value_owner(tree, node)?;
                validator.couplings.get(&owner).copied()
            })
    }

    /// Values offered for attribute `name` of `node` by the keyrefs using it.
    pub fn attribute_options(&self, tree: &XsdTree, node: NodeId, name: &str) -> Vec<Option<Vec<String>>> {
        self.validators
            .iter()
            .filter(|validator| validator.uses_attribute(name) && validator.nodes.contains(&node))
            .filter_map(|validator| {
                let refer = validator.refer?;
                Some(validator.options(&self.validators[refer], tree, node, name))
            })
            .collect()
    }

    /// Values offered for the value of `node` by the keyrefs using it.
    pub fn value_options(&self, tree: &XsdTree, node: NodeId) -> Vec<Option<Vec<String>>> {
        let name = tree.node_name(node);
        self.validators
            .iter()
            .filter_map(|validator| {
                let refer = validator.refer?;
                let owner = validator.value_owner(tree, node)?;
                Some(validator.options(&self.validators[refer], tree, owner, &name))
            })
            .collect()
    }
}
