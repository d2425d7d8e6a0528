//! The editing session: a tree plus everything kept in sync with it.
//!
//! Every mutation goes through [`Editor`], which drains the tree's events
//! after each operation and dispatches them, in order, to the undo log, the
//! key validators and the subscribed listeners.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use xsdtree_config::EditorConfig;
use xsdtree_document::{
    IncludeResolver, Namespace, NodeId, TreeError, TreeOptions, XmlError, XsdTree,
};
use xsdtree_schema::SchemaIndex;

use crate::keys::KeyValidators;
use crate::listener::{Listeners, SubscriptionId, TreeListener};
use crate::undo::{ActionType, ReplaySession, SubAction, UndoLog};
use crate::validation::{Target, Validator, Validators, intersect};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("nothing to paste")]
    EmptyClipboard,
}

#[derive(Debug)]
pub struct Editor {
    tree: XsdTree,
    config: EditorConfig,
    keys: KeyValidators,
    validators: Validators,
    undo: UndoLog,
    listeners: Listeners,
    clipboard: Option<NodeId>,
}

impl Editor {
    /// Creates a session on an empty document with an expanded root.
    pub fn new(schema: Arc<SchemaIndex>, config: EditorConfig) -> Result<Self, EditorError> {
        let options = TreeOptions {
            id_attribute: config.id_attribute.clone(),
            namespace: config.namespace().map(|(prefix, uri)| Namespace {
                prefix: prefix.to_string(),
                uri: uri.to_string(),
            }),
        };
        let keys = KeyValidators::new(&schema);
        debug!(constraints = keys.len(), "key validators created");
        let tree = XsdTree::new(schema, options)?;
        let mut editor = Editor {
            tree,
            undo: UndoLog::new(config.max_undo),
            config,
            keys,
            validators: Validators::default(),
            listeners: Listeners::default(),
            clipboard: None,
        };
        let root = editor.tree.root();
        editor.tree.children(root)?;
        editor.dispatch(false);
        Ok(editor)
    }

    pub fn tree(&self) -> &XsdTree {
        &self.tree
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn key_validators(&self) -> &KeyValidators {
        &self.keys
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn set_include_resolver(&mut self, resolver: IncludeResolver) {
        self.tree.set_include_resolver(resolver);
    }

    /// Children of `node`, expanding it first.
    pub fn children(&mut self, node: NodeId) -> Result<Vec<NodeId>, EditorError> {
        let children = self.tree.children(node);
        self.dispatch(false);
        Ok(children?)
    }

    /// Loads a document into the tree. Loading cannot be undone and clears
    /// the history.
    pub fn load_xml(&mut self, text: &str) -> Result<(), EditorError> {
        let result = self.tree.load_xml(text);
        self.dispatch(false);
        self.undo.clear();
        self.clipboard = None;
        result?;
        info!(nodes = self.tree.len(), "document loaded");
        Ok(())
    }

    pub fn save_xml(&self) -> Result<String, EditorError> {
        Ok(self.tree.save_xml()?)
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Registers a validator for nodes of type `path`.
    pub fn register_validator(
        &mut self,
        path: impl Into<String>,
        target: Target,
        validator: impl Validator + 'static,
    ) {
        self.validators.register(path, target, validator);
    }

    /// Subscribes to events about `scope` and below. See
    /// [`TreeListener`].
    pub fn subscribe(&mut self, scope: NodeId, listener: impl TreeListener + 'static) -> SubscriptionId {
        self.listeners.subscribe(&self.tree, scope, Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn start(&mut self, kind: ActionType, node: NodeId) {
        let parent = self.tree.parent(node);
        let label = self.tree.short_string(node);
        self.undo.start_action(kind, node, parent, label);
    }

    /// Runs a mutation as one undoable action.
    fn perform<T>(
        &mut self,
        kind: ActionType,
        node: NodeId,
        operation: impl FnOnce(&mut XsdTree) -> Result<T, TreeError>,
    ) -> Result<T, EditorError> {
        self.start(kind, node);
        let result = operation(&mut self.tree);
        self.flush(None);
        Ok(result?)
    }

    pub fn add(&mut self, node: NodeId) -> Result<NodeId, EditorError> {
        self.perform(ActionType::Add, node, |tree| tree.add(node))
    }

    pub fn activate(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.perform(ActionType::Activate, node, |tree| tree.set_active(node))
    }

    pub fn remove(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.perform(ActionType::Remove, node, |tree| tree.remove(node))
    }

    pub fn duplicate(&mut self, node: NodeId) -> Result<NodeId, EditorError> {
        self.perform(ActionType::Duplicate, node, |tree| tree.duplicate(node))
    }

    pub fn move_by(&mut self, node: NodeId, delta: isize) -> Result<(), EditorError> {
        self.perform(ActionType::Move, node, |tree| tree.move_by(node, delta))
    }

    /// Selects `option` in the choice `node` is an option of.
    pub fn set_option(&mut self, node: NodeId, option: NodeId) -> Result<(), EditorError> {
        self.perform(ActionType::OptionChange, node, |tree| tree.set_option(node, option))
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), EditorError> {
        self.perform(ActionType::ValueChange, node, |tree| tree.set_value(node, value))
    }

    pub fn set_attribute_value(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), EditorError> {
        let kind = if name == self.config.id_attribute {
            ActionType::IdChange
        } else {
            ActionType::AttributeChange
        };
        self.perform(kind, node, |tree| tree.set_attribute_value(node, name, value))
    }

    pub fn set_id(&mut self, node: NodeId, value: &str) -> Result<(), EditorError> {
        self.perform(ActionType::IdChange, node, |tree| tree.set_id(node, value))
    }

    pub fn copy(&mut self, node: NodeId) {
        self.clipboard = Some(node);
    }

    /// Copies `node` and removes it.
    pub fn cut(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.copy(node);
        self.perform(ActionType::Cut, node, |tree| tree.remove(node))
    }

    /// Replaces the content of `target` with that of the copied node.
    pub fn paste(&mut self, target: NodeId) -> Result<(), EditorError> {
        let source = self.clipboard.ok_or(EditorError::EmptyClipboard)?;
        self.perform(ActionType::Paste, target, |tree| tree.copy_into(source, target))
    }

    pub fn clipboard(&self) -> Option<NodeId> {
        self.clipboard
    }

    // =========================================================================
    // Undo
    // =========================================================================

    /// Reverts the last action. `false` when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let result = self.undo.undo(&mut self.tree);
        self.replayed(result)
    }

    /// Repeats the last undone action. `false` when there was nothing to
    /// redo.
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let result = self.undo.redo(&mut self.tree);
        self.replayed(result)
    }

    fn replayed(&mut self, result: Result<Option<ReplaySession>, TreeError>) -> Result<bool, EditorError> {
        match result {
            Ok(session) => {
                let replayed = session.is_some();
                self.flush(session);
                Ok(replayed)
            }
            Err(error) => {
                self.dispatch(false);
                Err(error.into())
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.undo.redo_description()
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    // =========================================================================
    // Event dispatch
    // =========================================================================

    /// Dispatches pending events, recording them unless they come from a
    /// replay.
    fn flush(&mut self, replay: Option<ReplaySession>) {
        self.dispatch(replay.is_none());
    }

    fn dispatch(&mut self, record: bool) {
        let events = self.tree.take_events();
        if events.is_empty() {
            return;
        }
        if record {
            for record in events.iter().filter(|record| record.is_direct()) {
                self.undo.record(SubAction::for_event(&self.tree, &record.event));
            }
        }
        self.keys.update(&self.tree, &events);
        for record in &events {
            self.listeners.notify(&self.tree, &record.event);
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// First message of the node validators, then the `xsd:all` check.
    pub fn report_invalid_node(&self, node: NodeId) -> Option<String> {
        if !self.tree.is_active(node) {
            return None;
        }
        self.validators
            .message(&self.tree, node, &Target::Node)
            .or_else(|| self.report_repeated_in_all(node))
    }

    fn report_repeated_in_all(&self, node: NodeId) -> Option<String> {
        let choice = self.tree.choice(node)?;
        if self.tree.node_name(choice) != "xsd:all" {
            return None;
        }
        let parent = self.tree.parent(node)?;
        let count = self
            .tree
            .loaded_children(parent)
            .iter()
            .filter(|sibling| self.tree.is_active(**sibling) && self.tree.same_type(**sibling, node))
            .count();
        (count > 1).then(|| format!("Element {} may only occur once.", self.tree.node_name(node)))
    }

    /// Message about the value of an active, editable node: registered
    /// validators and key constraints for a non empty value, then the
    /// schema.
    pub fn report_invalid_value(&self, node: NodeId) -> Option<String> {
        if !self.tree.is_active(node) || !self.tree.is_editable(node) {
            return None;
        }
        let has_value = self.tree.value(node).is_some_and(|value| !value.is_empty());
        if has_value {
            let message = self
                .validators
                .message(&self.tree, node, &Target::Value)
                .or_else(|| self.keys.value_message(&self.tree, node).map(str::to_string));
            if message.is_some() {
                return message;
            }
        }
        self.tree.schema_value_message(node)
    }

    /// Message about attribute `index` of an active node. An include node
    /// reports on its file under the first attribute.
    pub fn report_invalid_attribute_value(&self, node: NodeId, index: usize) -> Option<String> {
        if !self.tree.is_active(node) {
            return None;
        }
        if self.tree.is_xi_include(node) {
            return if index == 0 {
                self.tree.include_message(node)
            } else {
                None
            };
        }
        let attribute = self.tree.attributes(node).get(index)?;
        let has_value = attribute.value.as_deref().is_some_and(|value| !value.is_empty());
        if has_value {
            let target = Target::Attribute(attribute.name.clone());
            let message = self
                .validators
                .message(&self.tree, node, &target)
                .or_else(|| {
                    self.keys
                        .attribute_message(node, &attribute.name)
                        .map(str::to_string)
                });
            if message.is_some() {
                return message;
            }
        }
        self.tree.schema_attribute_message(node, index)
    }

    pub fn report_invalid_id(&self, node: NodeId) -> Option<String> {
        if !self.tree.is_identifiable(node) {
            return None;
        }
        let index = self.tree.attribute_index(node, &self.config.id_attribute)?;
        self.report_invalid_attribute_value(node, index)
    }

    /// Whether the node itself, not its children, is valid. Inactive nodes
    /// are.
    pub fn is_self_valid(&self, node: NodeId) -> bool {
        if !self.tree.is_active(node) {
            return true;
        }
        self.report_invalid_node(node).is_none()
            && self.report_invalid_value(node).is_none()
            && (0..self.tree.attribute_count(node))
                .all(|index| self.report_invalid_attribute_value(node, index).is_none())
    }

    /// Whether the node and all active nodes below it are valid, expanding
    /// them as needed.
    pub fn is_valid(&mut self, node: NodeId) -> Result<bool, EditorError> {
        if !self.tree.is_active(node) {
            return Ok(true);
        }
        let children = self.children(node)?;
        let mut valid = self.is_self_valid(node);
        for child in children {
            valid &= self.is_valid(child)?;
        }
        Ok(valid)
    }

    /// Every active node below `node` with its first message, in document
    /// order.
    pub fn messages(&mut self, node: NodeId) -> Result<Vec<(NodeId, String)>, EditorError> {
        let mut out = Vec::new();
        self.collect_messages(node, &mut out)?;
        Ok(out)
    }

    fn collect_messages(&mut self, node: NodeId, out: &mut Vec<(NodeId, String)>) -> Result<(), EditorError> {
        if !self.tree.is_active(node) {
            return Ok(());
        }
        let children = self.children(node)?;
        let message = self
            .report_invalid_node(node)
            .or_else(|| self.report_invalid_value(node))
            .or_else(|| {
                (0..self.tree.attribute_count(node))
                    .find_map(|index| self.report_invalid_attribute_value(node, index))
            });
        if let Some(message) = message {
            out.push((node, message));
        }
        for child in children {
            self.collect_messages(child, out)?;
        }
        Ok(())
    }

    // =========================================================================
    // Options and couplings
    // =========================================================================

    /// Values to offer for the node's value: booleans, the values allowed
    /// by every validator with a list, or the schema enumeration.
    pub fn value_options(&self, node: NodeId) -> Vec<String> {
        if self.tree.value_base_type(node).as_deref() == Some("xsd:boolean") {
            return vec!["true".to_string(), "false".to_string()];
        }
        let mut lists = self.validators.options(&self.tree, node, &Target::Value);
        lists.extend(self.keys.value_options(&self.tree, node));
        match intersect(lists) {
            Some(options) if !options.is_empty() => options,
            _ => self.tree.value_restrictions(node),
        }
    }

    pub fn attribute_options(&self, node: NodeId, index: usize) -> Vec<String> {
        if self.tree.is_xi_include(node) {
            return Vec::new();
        }
        if self.tree.attribute_base_type(node, index).as_deref() == Some("xsd:boolean") {
            return vec!["true".to_string(), "false".to_string()];
        }
        let Some(attribute) = self.tree.attributes(node).get(index) else {
            return Vec::new();
        };
        let target = Target::Attribute(attribute.name.clone());
        let mut lists = self.validators.options(&self.tree, node, &target);
        lists.extend(self.keys.attribute_options(&self.tree, node, &attribute.name));
        match intersect(lists) {
            Some(options) if !options.is_empty() => options,
            _ => self.tree.attribute_restrictions(node, index),
        }
    }

    /// Values the keyrefs on `field` of `node` accept: an attribute name,
    /// the name of a child element, or anything else for the node's value.
    /// `None` when no keyref applies or its key has no unique context.
    pub fn keyref_options(&self, node: NodeId, field: &str) -> Option<Vec<String>> {
        let lists = if self.tree.attribute_index(node, field).is_some() {
            self.keys.attribute_options(&self.tree, node, field)
        } else if let Some(child) = self.tree.first_child(node, field) {
            self.keys.value_options(&self.tree, child)
        } else {
            self.keys.value_options(&self.tree, node)
        };
        intersect(lists)
    }

    /// Key node referred to by attribute `name` of `node`.
    pub fn coupled_node_attribute(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.keys.coupled_attribute(node, name)
    }

    /// Key node referred to by the value of `node`.
    pub fn coupled_node_value(&self, node: NodeId) -> Option<NodeId> {
        self.keys.coupled_value(&self.tree, node)
    }
}
