//! Subscriptions to tree events.

use xsdtree_document::{NodeId, TreeEvent, XsdTree};

/// Receives the events of a subtree after each editor operation.
pub trait TreeListener {
    fn on_event(&mut self, tree: &XsdTree, event: &TreeEvent);
}

impl<F> TreeListener for F
where
    F: FnMut(&XsdTree, &TreeEvent),
{
    fn on_event(&mut self, tree: &XsdTree, event: &TreeEvent) {
        (*self)(tree, event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

struct Subscription {
    id: SubscriptionId,
    scope: NodeId,
    listener: Box<dyn TreeListener>,
}

#[derive(Default)]
pub(crate) struct Listeners {
    subscriptions: Vec<Subscription>,
    next: usize,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl Listeners {
    /// Subscribes to events about `scope` and its descendants. A listener
    /// on the root first receives a creation event for every attached node,
    /// parents before children.
    pub(crate) fn subscribe(
        &mut self,
        tree: &XsdTree,
        scope: NodeId,
        mut listener: Box<dyn TreeListener>,
    ) -> SubscriptionId {
        if scope == tree.root() {
            for node in tree.subtree(scope) {
                let Some(parent) = tree.parent(node) else {
                    continue;
                };
                if !tree.is_attached(node) {
                    continue;
                }
                let index = tree.position(node).unwrap_or_default();
                listener.on_event(tree, &TreeEvent::NodeCreated { node, parent, index });
            }
        }
        let id = SubscriptionId(self.next);
        self.next += 1;
        self.subscriptions.push(Subscription { id, scope, listener });
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|subscription| subscription.id != id);
        self.subscriptions.len() != before
    }

    pub(crate) fn notify(&mut self, tree: &XsdTree, event: &TreeEvent) {
        if self.subscriptions.is_empty() {
            return;
        }
        let ancestry = match event {
            // a removed node no longer leads up to the root
            TreeEvent::NodeRemoved { parent, .. } => {
                let mut ancestry = tree.ancestry(*parent);
                ancestry.push(event.node());
                ancestry
            }
            _ => tree.ancestry(event.node()),
        };
        for subscription in &mut self.subscriptions {
            if ancestry.contains(&subscription.scope) {
                subscription.listener.on_event(tree, event);
            }
        }
    }
}
