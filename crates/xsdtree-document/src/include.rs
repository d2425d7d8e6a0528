//! `xi:include` nodes.
//!
//! An include node has the attributes `File` and `Fallback`. Its children are
//! read from the first of the two that resolves: the included document's
//! root becomes a single child shaped like the sibling of the include that
//! accepts an element of that name.

use std::fmt;

use tracing::{debug, warn};
use xsdtree_schema::{Source, SourceResolver};

use crate::document::{NodeId, XsdTree};
use crate::error::TreeError;
use crate::event::{Origin, TreeEvent};
use crate::expand::Blueprint;
use crate::xml::xml_name;

/// Finds included documents relative to the edited document.
pub struct IncludeResolver {
    resolver: Box<dyn SourceResolver>,
    base: Option<String>,
}

impl IncludeResolver {
    /// `base` is the location of the edited document, if it has one.
    pub fn new(resolver: impl SourceResolver + 'static, base: Option<String>) -> Self {
        IncludeResolver {
            resolver: Box::new(resolver),
            base,
        }
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// The first of `file` and `fallback` that can be read.
    pub fn resolve(&self, file: Option<&str>, fallback: Option<&str>) -> Option<Source> {
        [file, fallback].into_iter().flatten().find_map(|location| {
            match self.resolver.resolve(self.base.as_deref(), location) {
                Ok(source) => Some(source),
                Err(error) => {
                    debug!(%error, location, "included file not resolved");
                    None
                }
            }
        })
    }
}

impl fmt::Debug for IncludeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeResolver")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

const FILE: usize = 0;
const FALLBACK: usize = 1;

impl XsdTree {
    /// Loads the included document as the only child of an include node.
    pub(crate) fn expand_include(&mut self, id: NodeId) -> Result<(), TreeError> {
        let file = self.attribute_value_at(id, FILE);
        let fallback = self.attribute_value_at(id, FALLBACK);
        if file.is_none() && fallback.is_none() {
            return Ok(());
        }
        let Some(resolver) = self.include_resolver() else {
            debug!(path = %self.path_string(id), "no include resolver");
            return Ok(());
        };
        let Some(source) = resolver.resolve(file, fallback) else {
            return Ok(());
        };
        let document = match roxmltree::Document::parse(&source.content) {
            Ok(document) => document,
            Err(error) => {
                warn!(%error, location = %source.location, "included file is not valid XML");
                return Ok(());
            }
        };
        let root = document.root_element();
        let name = xml_name(root);
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        for sibling in self.loaded_children(parent).to_vec() {
            if sibling == id || !self.is_relevant_node(sibling, &name)? {
                continue;
            }
            let node = self.node(sibling);
            let blueprint = Blueprint {
                schema_node: node.schema_node,
                hidden: node.hidden.clone(),
                referring: node.referring,
            };
            let child = self.create(Some(id), blueprint);
            self.node_mut(child).include = true;
            self.node_mut(id).children = Some(vec![child]);
            self.emit(
                Origin::Cascade,
                TreeEvent::NodeCreated {
                    node: child,
                    parent: id,
                    index: 0,
                },
            );
            self.load_element(child, root, Origin::Cascade)?;
            debug!(location = %source.location, %name, "loaded include");
            return Ok(());
        }
        warn!(location = %source.location, %name, "no node accepts the included root element");
        Ok(())
    }

    /// Problem with the file reference of an include node.
    pub fn include_message(&self, id: NodeId) -> Option<String> {
        if !self.is_xi_include(id) || !self.is_active(id) {
            return None;
        }
        let file = self.attribute_value_at(id, FILE)?;
        let fallback = self.attribute_value_at(id, FALLBACK);
        let resolver = self.include_resolver()?;
        match resolver.resolve(Some(file), fallback) {
            Some(_) => None,
            None => Some(format!("Unable to find file {file}.")),
        }
    }
}
