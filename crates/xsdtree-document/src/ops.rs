//! Mutations. Each records the events describing it.

use tracing::trace;

use crate::document::{NodeId, XsdTree};
use crate::error::TreeError;
use crate::event::{Origin, TreeEvent};
use crate::expand::Blueprint;
use crate::node::NodeSnapshot;

impl XsdTree {
    /// Adds an instance of `id` right after it. For a choice option this is
    /// a new choice with the same option selected.
    pub fn add(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        self.add_inner(id, Origin::Direct)
    }

    pub(crate) fn add_inner(&mut self, id: NodeId, origin: Origin) -> Result<NodeId, TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.position(id).ok_or(TreeError::Detached(id))? + 1;
        if !self.is_addable(id) {
            return Err(TreeError::MaxOccurs(id));
        }
        let added = match self.choice(id) {
            Some(choice) => {
                let option_index = self
                    .node(choice)
                    .options
                    .iter()
                    .position(|option| *option == id)
                    .unwrap_or(0);
                let blueprint = Blueprint {
                    schema_node: self.node(choice).schema_node,
                    hidden: self.node(choice).hidden.clone(),
                    referring: None,
                };
                let new_choice = self.create(Some(parent), blueprint);
                self.create_options(new_choice)?;
                let Some(&option) = self.node(new_choice).options.get(option_index) else {
                    return Err(TreeError::NotAChoice(id));
                };
                self.node_mut(new_choice).selected = Some(option);
                option
            }
            None => {
                let node = self.node(id);
                let blueprint = Blueprint {
                    schema_node: node.schema_node,
                    hidden: node.hidden.clone(),
                    referring: node.referring,
                };
                self.create(Some(parent), blueprint)
            }
        };
        self.node_mut(added).active = true;
        self.insert_child(parent, index, added);
        self.emit(
            origin,
            TreeEvent::NodeCreated {
                node: added,
                parent,
                index,
            },
        );
        Ok(added)
    }

    /// Removes `id` from its parent. The only instance of an optional
    /// element is deactivated instead.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.position(id).ok_or(TreeError::Detached(id))?;
        let count = self.sibling_positions(id).len();
        let min_occurs = self.min_occurs(id);
        if min_occurs == 0 && count == 1 {
            return self.set_inactive(id);
        }
        if count <= min_occurs {
            return Err(TreeError::MinOccurs(id));
        }
        self.detach(id)?;
        trace!(?id, ?parent, index, "removed node");
        Ok(())
    }

    /// Detaches `id` from its parent's children without any occurrence
    /// rules.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.position(id).ok_or(TreeError::Detached(id))?;
        if let Some(children) = self.node_mut(parent).children.as_mut() {
            children.remove(index);
        }
        self.node_mut(id).parent = None;
        self.emit(
            Origin::Direct,
            TreeEvent::NodeRemoved {
                node: id,
                parent,
                index,
            },
        );
        Ok(())
    }

    /// Attaches a detached node at `index` of `parent`, as undoing a removal.
    pub fn attach(&mut self, id: NodeId, parent: NodeId, index: usize) -> Result<(), TreeError> {
        if self.parent(id).is_some() && self.position(id).is_some() {
            return Ok(());
        }
        self.node_mut(id).parent = Some(parent);
        let index = index.min(self.loaded_children(parent).len());
        self.insert_child(parent, index, id);
        self.emit(
            Origin::Direct,
            TreeEvent::NodeCreated {
                node: id,
                parent,
                index,
            },
        );
        Ok(())
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let children = self.node_mut(parent).children.get_or_insert_with(Vec::new);
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Inserts a deep copy of `id` right after it.
    pub fn duplicate(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.position(id).ok_or(TreeError::Detached(id))? + 1;
        if !self.is_addable(id) {
            return Err(TreeError::MaxOccurs(id));
        }
        let copy = self.deep_copy(id, parent, true);
        self.insert_child(parent, index, copy);
        self.emit(
            Origin::Direct,
            TreeEvent::NodeCreated {
                node: copy,
                parent,
                index,
            },
        );
        Ok(copy)
    }

    /// Copies `source` and its loaded subtree under `parent`. The copy is
    /// not placed in any child list.
    pub(crate) fn deep_copy(&mut self, source: NodeId, parent: NodeId, with_choice: bool) -> NodeId {
        let original = self.node(source).clone();
        let mut node = original.clone();
        node.parent = Some(parent);
        node.children = None;
        node.choice = None;
        node.options = Vec::new();
        node.selected = None;
        let copy = self.push(node);
        let name = self.node_name(copy);
        self.node_mut(copy).path = self.build_path(Some(parent), &name);
        if let Some(children) = original.children {
            let copies = children
                .iter()
                .map(|child| self.deep_copy(*child, copy, true))
                .collect();
            self.node_mut(copy).children = Some(copies);
        }
        if with_choice
            && let Some(choice) = original.choice
            && choice != source
        {
            let choice_node = self.node(choice).clone();
            let mut node = choice_node.clone();
            node.parent = Some(parent);
            node.options = Vec::new();
            let copy_choice = self.push(node);
            let options: Vec<NodeId> = choice_node
                .options
                .iter()
                .map(|option| {
                    if *option == source {
                        copy
                    } else {
                        self.deep_copy(*option, parent, false)
                    }
                })
                .collect();
            for option in &options {
                self.node_mut(*option).choice = Some(copy_choice);
            }
            let selected = choice_node
                .selected
                .and_then(|selected| choice_node.options.iter().position(|o| *o == selected))
                .map(|index| options[index]);
            let node = self.node_mut(copy_choice);
            node.choice = Some(copy_choice);
            node.selected = selected;
            node.options = options;
        }
        copy
    }

    /// Selects `option` in the choice `id` belongs to. The previously
    /// selected option keeps its content and can be selected again.
    pub fn set_option(&mut self, id: NodeId, option: NodeId) -> Result<(), TreeError> {
        self.set_option_inner(id, option, Origin::Direct)
    }

    pub(crate) fn set_option_inner(
        &mut self,
        id: NodeId,
        option: NodeId,
        origin: Origin,
    ) -> Result<(), TreeError> {
        let choice = self.choice(id).ok_or(TreeError::NotAChoice(id))?;
        if !self.node(choice).options.contains(&option) {
            return Err(TreeError::NotAnOption { node: id, option });
        }
        let previous = self.node(choice).selected.ok_or(TreeError::NotAChoice(id))?;
        if previous == option {
            return Ok(());
        }
        let parent = self.parent(previous).ok_or(TreeError::Detached(previous))?;
        let index = self.position(previous).ok_or(TreeError::Detached(previous))?;
        if let Some(children) = self.node_mut(parent).children.as_mut() {
            children[index] = option;
        }
        self.node_mut(option).parent = Some(parent);
        self.node_mut(choice).selected = Some(option);
        self.emit(
            origin,
            TreeEvent::OptionChanged {
                choice,
                selected: option,
                previous,
            },
        );
        Ok(())
    }

    /// Moves `id` by `delta` among its same-type siblings, clamped to their
    /// range.
    pub fn move_by(&mut self, id: NodeId, delta: isize) -> Result<(), TreeError> {
        let from = self.position(id).ok_or(TreeError::Detached(id))?;
        let positions = self.sibling_positions(id);
        let (Some(&first), Some(&last)) = (positions.first(), positions.last()) else {
            return Ok(());
        };
        let to = (from as isize + delta).clamp(first as isize, last as isize) as usize;
        self.move_to(id, to)
    }

    /// Moves `id` to child index `to` of its parent.
    pub fn move_to(&mut self, id: NodeId, to: usize) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let from = self.position(id).ok_or(TreeError::Detached(id))?;
        let Some(children) = self.node_mut(parent).children.as_mut() else {
            return Ok(());
        };
        let to = to.min(children.len() - 1);
        if to == from {
            return Ok(());
        }
        let node = children.remove(from);
        children.insert(to, node);
        self.emit(Origin::Direct, TreeEvent::Moved { node: id, from, to });
        Ok(())
    }

    /// Sets the text value. An empty value clears it.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), TreeError> {
        if !self.is_editable(id) {
            return Err(TreeError::NotEditable(id));
        }
        self.replace_value(id, value);
        Ok(())
    }

    /// Sets the text value without checking that the node takes one.
    pub fn replace_value(&mut self, id: NodeId, value: &str) {
        self.replace_value_inner(id, value, Origin::Direct);
    }

    pub(crate) fn replace_value_inner(&mut self, id: NodeId, value: &str, origin: Origin) {
        let value = (!value.is_empty()).then(|| value.to_string());
        if self.node(id).value == value {
            return;
        }
        let previous = std::mem::replace(&mut self.node_mut(id).value, value);
        self.emit(origin, TreeEvent::ValueChanged { node: id, previous });
    }

    pub fn set_attribute_value(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let index = self
            .attribute_index(id, name)
            .ok_or_else(|| TreeError::UnknownAttribute {
                node: id,
                name: name.to_string(),
            })?;
        self.set_attribute_value_at(id, index, value)
    }

    /// Sets an attribute. Empty values, and a boolean equal to its default,
    /// clear it. On an `xi:include` node the included content is reloaded.
    pub fn set_attribute_value_at(
        &mut self,
        id: NodeId,
        index: usize,
        value: &str,
    ) -> Result<(), TreeError> {
        self.set_attribute_value_inner(id, index, value, Origin::Direct)
    }

    pub(crate) fn set_attribute_value_inner(
        &mut self,
        id: NodeId,
        index: usize,
        value: &str,
        origin: Origin,
    ) -> Result<(), TreeError> {
        let attribute = self
            .node(id)
            .attributes
            .get(index)
            .ok_or(TreeError::AttributeIndex { node: id, index })?;
        let default_boolean = attribute.declaration.is_some_and(|declaration| {
            self.schema().attribute(declaration, "type") == Some("xsd:boolean")
                && self.schema().attribute(declaration, "default") == Some(value)
        });
        let value = (!value.is_empty() && !default_boolean).then(|| value.to_string());
        if attribute.value == value {
            return Ok(());
        }
        let name = attribute.name.clone();
        let previous = std::mem::replace(&mut self.node_mut(id).attributes[index].value, value);
        if self.is_xi_include(id) {
            self.re_expand(id)?;
        }
        self.emit(
            origin,
            TreeEvent::AttributeChanged {
                node: id,
                attribute: name,
                previous,
            },
        );
        Ok(())
    }

    /// Sets the identifying attribute.
    pub fn set_id(&mut self, id: NodeId, value: &str) -> Result<(), TreeError> {
        let attribute = self.options().id_attribute.clone();
        self.set_attribute_value(id, &attribute, value)
    }

    /// Makes the node part of the document. The first activation expands
    /// it; activating the selected option of a choice activates all
    /// options.
    pub fn set_active(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.set_active_inner(id, Origin::Direct)
    }

    pub(crate) fn set_active_inner(&mut self, id: NodeId, origin: Origin) -> Result<(), TreeError> {
        if self.node(id).active {
            return Ok(());
        }
        if self.parent(id).is_none() && id != self.root() {
            return Err(TreeError::Detached(id));
        }
        self.node_mut(id).active = true;
        if self.node(id).deactivated {
            if self.is_xi_include(id) {
                for child in self.loaded_children(id).to_vec() {
                    self.set_active_inner(child, Origin::Cascade)?;
                }
            }
            self.emit(origin, TreeEvent::ActivationChanged { node: id, active: true });
            return Ok(());
        }
        self.assure_children(id)?;
        if let Some(choice) = self.choice(id)
            && self.node(choice).selected == Some(id)
        {
            self.node_mut(choice).active = true;
            for option in self.node(choice).options.clone() {
                if option != id {
                    self.set_active_inner(option, Origin::Cascade)?;
                }
            }
        }
        self.emit(origin, TreeEvent::ActivationChanged { node: id, active: true });
        Ok(())
    }

    /// Takes the node out of the document, keeping its content for a later
    /// [`XsdTree::set_active`].
    pub fn set_inactive(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.set_inactive_inner(id, Origin::Direct)
    }

    fn set_inactive_inner(&mut self, id: NodeId, origin: Origin) -> Result<(), TreeError> {
        if !self.node(id).active {
            return Ok(());
        }
        let node = self.node_mut(id);
        node.active = false;
        node.deactivated = true;
        self.emit(origin, TreeEvent::ActivationChanged { node: id, active: false });
        if self.is_xi_include(id) {
            for child in self.loaded_children(id).to_vec() {
                self.set_inactive_inner(child, Origin::Cascade)?;
            }
        }
        Ok(())
    }

    pub fn snapshot(&self, id: NodeId) -> NodeSnapshot {
        let node = self.node(id);
        NodeSnapshot {
            value: node.value.clone(),
            attributes: node.attributes.clone(),
            children: node.children.clone(),
            active: node.active,
            deactivated: node.deactivated,
        }
    }

    /// Replaces value, attributes and children of `target` with a copy of
    /// those of `source`.
    pub fn copy_into(&mut self, source: NodeId, target: NodeId) -> Result<(), TreeError> {
        if !self.can_contain(target, source) {
            return Err(TreeError::CannotContain { from: source, target });
        }
        let children = self.node(source).children.clone().map(|children| {
            children
                .iter()
                .map(|child| self.deep_copy(*child, target, true))
                .collect()
        });
        let source_node = self.node(source);
        let content = NodeSnapshot {
            value: source_node.value.clone(),
            attributes: source_node.attributes.clone(),
            children,
            active: true,
            deactivated: source_node.deactivated,
        };
        self.restore(target, content);
        Ok(())
    }

    /// Puts back content captured by [`XsdTree::snapshot`].
    pub fn restore(&mut self, id: NodeId, snapshot: NodeSnapshot) {
        let current = self.snapshot(id);
        for (index, &child) in current.children().iter().enumerate().rev() {
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
        for (index, &child) in snapshot.children().iter().enumerate() {
            self.node_mut(child).parent = Some(id);
            self.emit(
                Origin::Cascade,
                TreeEvent::NodeCreated {
                    node: child,
                    parent: id,
                    index,
                },
            );
        }
        let node = self.node_mut(id);
        node.value = snapshot.value;
        node.attributes = snapshot.attributes;
        node.children = snapshot.children;
        node.active = snapshot.active;
        node.deactivated = snapshot.deactivated;
        self.emit(
            Origin::Direct,
            TreeEvent::Replaced {
                node: id,
                previous: Box::new(current),
            },
        );
    }
}
