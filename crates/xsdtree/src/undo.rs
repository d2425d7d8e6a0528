//! Linear undo history over tree events.
//!
//! An action groups the sub-actions recorded while one editor operation
//! runs. Each sub-action holds the closures that revert and repeat one
//! primitive [`TreeEvent`]. Undo plays an action's sub-actions backwards,
//! redo forwards; the replay produces events of its own, which the caller
//! dispatches under the [`ReplaySession`] it got back so they are not
//! recorded again.

use std::collections::VecDeque;
use std::fmt;

use tracing::{trace, warn};
use xsdtree_document::{NodeId, TreeError, TreeEvent, XsdTree};

/// Kind of user operation an action stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Add,
    Activate,
    Remove,
    Duplicate,
    Move,
    OptionChange,
    AttributeChange,
    IdChange,
    ValueChange,
    Paste,
    Cut,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActionType::Add => "add",
            ActionType::Activate => "activate",
            ActionType::Remove => "remove",
            ActionType::Duplicate => "duplicate",
            ActionType::Move => "move",
            ActionType::OptionChange => "option change",
            ActionType::AttributeChange => "attribute change",
            ActionType::IdChange => "id change",
            ActionType::ValueChange => "value change",
            ActionType::Paste => "paste",
            ActionType::Cut => "cut",
        };
        f.write_str(text)
    }
}

type Replay = Box<dyn Fn(&mut XsdTree) -> Result<(), TreeError>>;

/// Reverts and repeats one primitive change.
pub struct SubAction {
    undo: Replay,
    redo: Replay,
}

impl SubAction {
    pub fn new(
        undo: impl Fn(&mut XsdTree) -> Result<(), TreeError> + 'static,
        redo: impl Fn(&mut XsdTree) -> Result<(), TreeError> + 'static,
    ) -> Self {
        SubAction {
            undo: Box::new(undo),
            redo: Box::new(redo),
        }
    }

    /// The sub-action reverting `event`, which was just applied to `tree`.
    ///
    /// The state to redo is read from `tree` when this is called, not when
    /// the event fired. Call it once the operation that emitted `event` has
    /// finished and before any other change, so a single operation must not
    /// touch the same value or attribute twice.
    pub fn for_event(tree: &XsdTree, event: &TreeEvent) -> Self {
        match event.clone() {
            TreeEvent::NodeCreated {
                node,
                parent,
                index,
            } => SubAction::new(
                move |tree| tree.detach(node),
                move |tree| tree.attach(node, parent, index),
            ),
            TreeEvent::NodeRemoved {
                node,
                parent,
                index,
            } => SubAction::new(
                move |tree| tree.attach(node, parent, index),
                move |tree| tree.detach(node),
            ),
            TreeEvent::ValueChanged { node, previous } => {
                let current = tree.value(node).unwrap_or_default().to_string();
                let previous = previous.unwrap_or_default();
                SubAction::new(
                    move |tree| {
                        tree.replace_value(node, &previous);
                        Ok(())
                    },
                    move |tree| {
                        tree.replace_value(node, &current);
                        Ok(())
                    },
                )
            }
            TreeEvent::AttributeChanged {
                node,
                attribute,
                previous,
            } => {
                let current = tree
                    .attribute_value(node, &attribute)
                    .unwrap_or_default()
                    .to_string();
                let previous = previous.unwrap_or_default();
                let name = attribute.clone();
                SubAction::new(
                    move |tree| tree.set_attribute_value(node, &attribute, &previous),
                    move |tree| tree.set_attribute_value(node, &name, &current),
                )
            }
            TreeEvent::ActivationChanged { node, active } => {
                let toggle = move |tree: &mut XsdTree, active: bool| {
                    if active {
                        tree.set_active(node)
                    } else {
                        tree.set_inactive(node)
                    }
                };
                SubAction::new(
                    move |tree| toggle(tree, !active),
                    move |tree| toggle(tree, active),
                )
            }
            TreeEvent::OptionChanged {
                selected, previous, ..
            } => SubAction::new(
                move |tree| tree.set_option(selected, previous),
                move |tree| tree.set_option(previous, selected),
            ),
            TreeEvent::Moved { node, from, to } => SubAction::new(
                move |tree| tree.move_to(node, from),
                move |tree| tree.move_to(node, to),
            ),
            TreeEvent::Replaced { node, previous } => {
                let current = tree.snapshot(node);
                SubAction::new(
                    move |tree| {
                        tree.restore(node, (*previous).clone());
                        Ok(())
                    },
                    move |tree| {
                        tree.restore(node, current.clone());
                        Ok(())
                    },
                )
            }
        }
    }
}

impl fmt::Debug for SubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubAction").finish_non_exhaustive()
    }
}

/// A user operation and the primitive changes it caused.
#[derive(Debug)]
pub struct Action {
    pub kind: ActionType,
    pub node: NodeId,
    /// Parent of `node` when the action started.
    pub parent: Option<NodeId>,
    /// Short label of `node`, for menu text.
    pub label: String,
    sub_actions: Vec<SubAction>,
}

impl Action {
    pub fn len(&self) -> usize {
        self.sub_actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_actions.is_empty()
    }
}

/// Proof that events being dispatched come from undo or redo.
///
/// Only [`UndoLog::undo`] and [`UndoLog::redo`] create one.
#[derive(Debug)]
#[must_use = "events of the replay must be dispatched with the session"]
pub struct ReplaySession {
    _private: (),
}

/// Bounded linear undo history.
#[derive(Debug)]
pub struct UndoLog {
    queue: VecDeque<Action>,
    /// Number of actions in `queue` that are done; the rest were undone.
    done: usize,
    pending: Option<Action>,
    /// Whether the last queued action still takes sub-actions.
    open: bool,
    max_actions: usize,
}

impl UndoLog {
    pub fn new(max_actions: usize) -> Self {
        UndoLog {
            queue: VecDeque::new(),
            done: 0,
            pending: None,
            open: false,
            max_actions: max_actions.max(1),
        }
    }

    /// Opens an action. It is only queued once something is recorded for
    /// it; a previous action that recorded nothing is dropped.
    pub fn start_action(&mut self, kind: ActionType, node: NodeId, parent: Option<NodeId>, label: String) {
        trace!(%kind, ?node, "start action");
        self.pending = Some(Action {
            kind,
            node,
            parent,
            label,
            sub_actions: Vec::new(),
        });
        self.open = false;
    }

    /// Appends a sub-action to the open action.
    pub fn record(&mut self, sub_action: SubAction) {
        if let Some(action) = self.pending.take() {
            // a new edit after undo discards the undone actions
            self.queue.truncate(self.done);
            self.queue.push_back(action);
            if self.queue.len() > self.max_actions {
                self.queue.pop_front();
            }
            self.done = self.queue.len();
            self.open = true;
        }
        if !self.open {
            trace!("change outside of an action is not recorded");
            return;
        }
        if let Some(action) = self.queue.back_mut() {
            action.sub_actions.push(sub_action);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.done > 0
    }

    pub fn can_redo(&self) -> bool {
        self.done < self.queue.len()
    }

    /// Reverts the last done action.
    pub fn undo(&mut self, tree: &mut XsdTree) -> Result<Option<ReplaySession>, TreeError> {
        if !self.can_undo() {
            return Ok(None);
        }
        self.open = false;
        self.pending = None;
        let action = &self.queue[self.done - 1];
        trace!(kind = %action.kind, sub_actions = action.len(), "undo");
        for (applied, sub_action) in action.sub_actions.iter().rev().enumerate() {
            if let Err(error) = (sub_action.undo)(tree) {
                let reverted = &action.sub_actions[action.len() - applied..];
                roll_back(tree, reverted.iter(), |sub_action| &sub_action.redo);
                return Err(error);
            }
        }
        self.done -= 1;
        Ok(Some(ReplaySession { _private: () }))
    }

    /// Repeats the first undone action.
    pub fn redo(&mut self, tree: &mut XsdTree) -> Result<Option<ReplaySession>, TreeError> {
        if !self.can_redo() {
            return Ok(None);
        }
        self.open = false;
        self.pending = None;
        let action = &self.queue[self.done];
        trace!(kind = %action.kind, sub_actions = action.len(), "redo");
        for (applied, sub_action) in action.sub_actions.iter().enumerate() {
            if let Err(error) = (sub_action.redo)(tree) {
                let repeated = action.sub_actions[..applied].iter().rev();
                roll_back(tree, repeated, |sub_action| &sub_action.undo);
                return Err(error);
            }
        }
        self.done += 1;
        Ok(Some(ReplaySession { _private: () }))
    }

    /// Action that [`UndoLog::undo`] would revert.
    pub fn undo_action(&self) -> Option<&Action> {
        self.done.checked_sub(1).and_then(|index| self.queue.get(index))
    }

    /// Action that [`UndoLog::redo`] would repeat.
    pub fn redo_action(&self) -> Option<&Action> {
        self.queue.get(self.done)
    }

    /// Menu text such as `Undo add (Node)`.
    pub fn undo_description(&self) -> Option<String> {
        self.undo_action()
            .map(|action| format!("Undo {} ({})", action.kind, action.label))
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_action()
            .map(|action| format!("Redo {} ({})", action.kind, action.label))
    }

    /// Number of queued actions, done or undone.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.done = 0;
        self.pending = None;
        self.open = false;
    }
}

/// Reverses the sub-actions a failed replay already applied, so the tree
/// matches the cursor again. `sub_actions` come in the order their
/// `inverse` has to run.
fn roll_back<'a>(
    tree: &mut XsdTree,
    sub_actions: impl Iterator<Item = &'a SubAction>,
    inverse: impl Fn(&SubAction) -> &Replay,
) {
    for sub_action in sub_actions {
        if let Err(error) = inverse(sub_action)(tree) {
            warn!(%error, "unable to roll back a failed replay");
        }
    }
}
