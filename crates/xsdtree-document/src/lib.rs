//! The tree model edited against a loaded schema.
//!
//! An [`XsdTree`] is an arena of [`NodeId`] handles. Nodes are created lazily:
//! a node's children only exist after the first call to
//! [`XsdTree::children`], which projects the schema's element, sequence,
//! choice and extension structure onto tree nodes in declaration order.
//!
//! Every mutation records [`TreeEvent`]s in the tree. The tree never calls
//! out to observers itself; whoever drives it drains the events with
//! [`XsdTree::take_events`] and dispatches them.

pub mod document;
pub mod error;
pub mod event;
mod expand;
pub mod include;
mod node;
mod ops;
mod query;
pub mod xml;

pub use document::{Namespace, NodeId, TreeOptions, XsdTree};
pub use error::{TreeError, XmlError};
pub use event::{EventRecord, Origin, TreeEvent};
pub use include::IncludeResolver;
pub use node::{Attribute, NodeSnapshot};
