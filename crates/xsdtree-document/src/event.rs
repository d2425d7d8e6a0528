//! Change notifications recorded by tree mutations.

use crate::document::NodeId;
use crate::node::NodeSnapshot;

/// A primitive change to the tree.
///
/// Every variant carries what is needed to revert it, so an undo log can be
/// built from events alone.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    /// `node` was inserted at `index` in the children of `parent`.
    NodeCreated {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// `node` was detached from `index` in the children of `parent`. The
    /// node and its subtree stay in the arena.
    NodeRemoved {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    ValueChanged {
        node: NodeId,
        previous: Option<String>,
    },
    AttributeChanged {
        node: NodeId,
        attribute: String,
        previous: Option<String>,
    },
    ActivationChanged {
        node: NodeId,
        active: bool,
    },
    /// The choice owning `selected` switched from `previous` to `selected`.
    OptionChanged {
        choice: NodeId,
        selected: NodeId,
        previous: NodeId,
    },
    Moved {
        node: NodeId,
        from: usize,
        to: usize,
    },
    /// Value, attributes and children of `node` were replaced wholesale.
    Replaced {
        node: NodeId,
        previous: Box<NodeSnapshot>,
    },
}

impl TreeEvent {
    /// The node the event is about.
    pub fn node(&self) -> NodeId {
        match self {
            TreeEvent::NodeCreated { node, .. }
            | TreeEvent::NodeRemoved { node, .. }
            | TreeEvent::ValueChanged { node, .. }
            | TreeEvent::AttributeChanged { node, .. }
            | TreeEvent::ActivationChanged { node, .. }
            | TreeEvent::Moved { node, .. }
            | TreeEvent::Replaced { node, .. } => *node,
            TreeEvent::OptionChanged { selected, .. } => *selected,
        }
    }

    /// Whether the event changes which nodes are part of the document.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            TreeEvent::ValueChanged { .. } | TreeEvent::AttributeChanged { .. }
        )
    }
}

/// Why an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Directly caused by the requested operation.
    Direct,
    /// A side effect: lazy expansion, or the fan out of a larger operation
    /// whose direct event already describes how to revert it.
    Cascade,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event: TreeEvent,
    pub origin: Origin,
}

impl EventRecord {
    pub fn is_direct(&self) -> bool {
        self.origin == Origin::Direct
    }
}
