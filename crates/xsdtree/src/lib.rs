//! Editing sessions over schema-driven XML trees.
//!
//! [`Editor`] owns an [`XsdTree`](xsdtree_document::XsdTree) and keeps the
//! derived state in step with it: identity constraints ([`keys`]), the undo
//! history ([`undo`]), registered validators ([`validation`]) and event
//! listeners ([`listener`]).

pub mod editor;
pub mod keys;
pub mod listener;
pub mod undo;
pub mod validation;

pub use editor::{Editor, EditorError};
pub use keys::{KeyValidator, KeyValidators};
pub use listener::{SubscriptionId, TreeListener};
pub use undo::{Action, ActionType, ReplaySession, SubAction, UndoLog};
pub use validation::{Target, Validator, Validators};

pub use xsdtree_config::EditorConfig;
pub use xsdtree_document::{NodeId, TreeError, TreeEvent, XmlError, XsdTree};
pub use xsdtree_schema::SchemaIndex;
