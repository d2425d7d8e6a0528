use thiserror::Error;
use xsdtree_schema::SchemaError;

use crate::document::NodeId;

/// Invalid use of the tree API.
///
/// Operations returning this error leave the tree unchanged, except for
/// [`TreeError::Schema`], which may leave a node partially expanded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error("node {node:?} has no attribute {name}")]
    UnknownAttribute { node: NodeId, name: String },
    #[error("attribute index {index} out of range for node {node:?}")]
    AttributeIndex { node: NodeId, index: usize },
    #[error("node {0:?} does not take a value")]
    NotEditable(NodeId),
    #[error("node {0:?} is not a choice option")]
    NotAChoice(NodeId),
    #[error("node {option:?} is not an option of the choice of {node:?}")]
    NotAnOption { node: NodeId, option: NodeId },
    #[error("node {0:?} has reached its maximum number of occurrences")]
    MaxOccurs(NodeId),
    #[error("node {0:?} cannot be removed below its minimum number of occurrences")]
    MinOccurs(NodeId),
    #[error("node {target:?} cannot contain the content of node {from:?}")]
    CannotContain { from: NodeId, target: NodeId },
}

/// Failures reading or writing an XML document.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] roxmltree::Error),
    #[error("root element {found} does not match schema root {expected}")]
    RootMismatch { expected: String, found: String },
    #[error("failed to write XML: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to write XML: {0}")]
    Writer(#[from] quick_xml::Error),
    #[error("written XML is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Tree(#[from] TreeError),
}
