//! Validators registered from outside the schema.
//!
//! A validator is attached to a node type path (matched with
//! [`XsdTree::is_type`]) and checks either the node itself, its value, or
//! one of its attributes. Any `Fn(&XsdTree, NodeId) -> Option<String>`
//! closure is a validator.

use xsdtree_document::{NodeId, XsdTree};

pub trait Validator {
    /// A message when the checked data of `node` is invalid.
    fn validate(&self, tree: &XsdTree, node: NodeId) -> Option<String>;

    /// Values the checked data may take, when the validator restricts them
    /// to a list.
    fn options(&self, _tree: &XsdTree, _node: NodeId) -> Option<Vec<String>> {
        None
    }
}

impl<F> Validator for F
where
    F: Fn(&XsdTree, NodeId) -> Option<String>,
{
    fn validate(&self, tree: &XsdTree, node: NodeId) -> Option<String> {
        (*self)(tree, node)
    }
}

/// What a validator checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Node,
    Value,
    Attribute(String),
}

struct Registration {
    path: String,
    target: Target,
    validator: Box<dyn Validator>,
}

#[derive(Default)]
pub struct Validators {
    registrations: Vec<Registration>,
}

impl std::fmt::Debug for Validators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| (&r.path, &r.target)))
            .finish()
    }
}

impl Validators {
    pub fn register(&mut self, path: impl Into<String>, target: Target, validator: impl Validator + 'static) {
        self.registrations.push(Registration {
            path: path.into(),
            target,
            validator: Box::new(validator),
        });
    }

    fn matching<'a>(
        &'a self,
        tree: &'a XsdTree,
        node: NodeId,
        target: &'a Target,
    ) -> impl Iterator<Item = &'a dyn Validator> + 'a {
        self.registrations
            .iter()
            .filter(move |r| r.target == *target && tree.is_type(node, &r.path))
            .map(|r| r.validator.as_ref())
    }

    /// First message of the validators for `target` of `node`, in
    /// registration order.
    pub fn message(&self, tree: &XsdTree, node: NodeId, target: &Target) -> Option<String> {
        self.matching(tree, node, target)
            .find_map(|validator| validator.validate(tree, node))
    }

    /// Option lists of the validators for `target` of `node`.
    pub fn options(&self, tree: &XsdTree, node: NodeId, target: &Target) -> Vec<Option<Vec<String>>> {
        self.matching(tree, node, target)
            .map(|validator| validator.options(tree, node))
            .collect()
    }
}

/// Values present in every list, in the order of the first. Lists that are
/// `None` do not restrict.
pub(crate) fn intersect(lists: Vec<Option<Vec<String>>>) -> Option<Vec<String>> {
    let mut lists = lists.into_iter().flatten();
    let mut result = lists.next()?;
    for list in lists {
        result.retain(|value| list.contains(value));
    }
    Some(result)
}
