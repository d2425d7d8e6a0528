//! Reading schema files into a [`SchemaIndex`].
//!
//! # Algorithm
//!
//! Loading is a queue of `(path, node, extend_path)` units starting at the
//! main document. Each unit walks its node's children, registering named
//! elements by path, named types by name and identity constraints under the
//! root element. Children that can only be resolved later, such as elements
//! whose type is declared further down in the file, are queued again.
//!
//! An `xsd:extension` whose base is not yet known is re-queued once; a
//! single-shot flag stops it from re-queueing itself forever.
//!
//! Paths that end in a repeated suffix are considered recursive and are not
//! expanded further (see [`crate::path::is_recursive`]).

use std::collections::VecDeque;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, trace, warn};

use crate::diagnostics::{self, SchemaDiagnostic};
use crate::error::SchemaError;
use crate::index::{ConstraintCategory, ConstraintDef, SchemaIndex};
use crate::node::{NodeKind, SchemaNodeId, SchemaNodes};
use crate::parse::parse_schema;
use crate::path;
use crate::resolve::{MemoryResolver, SourceResolver};

struct QueueItem {
    path: String,
    node: SchemaNodeId,
    extend_path: bool,
    /// An element whose type was not yet registered when first seen.
    deferred_element: bool,
}

/// Builder for loading a [`SchemaIndex`].
pub struct SchemaLoader<R> {
    resolver: R,
    root_element: Option<String>,
}

impl<R: SourceResolver> SchemaLoader<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            root_element: None,
        }
    }

    /// Name of the root element. Defaults to the first named top-level
    /// element of the main file.
    pub fn root_element(mut self, name: Option<String>) -> Self {
        self.root_element = name;
        self
    }

    pub fn load(&self, location: &str) -> Result<SchemaIndex, SchemaError> {
        let source = self.resolver.resolve(None, location)?;
        let mut nodes = SchemaNodes::default();
        let document = parse_schema(&mut nodes, &source.location, &source.content)?;

        let root_name = match &self.root_element {
            Some(name) => name.clone(),
            None => first_top_level_element(&nodes, document).ok_or_else(|| {
                SchemaError::NoRootElement {
                    location: source.location.clone(),
                }
            })?,
        };
        debug!(%root_name, location = %source.location, "loading schema");

        let mut state = LoadState {
            resolver: &self.resolver,
            nodes,
            root: None,
            root_name,
            read_files: IndexSet::new(),
            types: IndexMap::new(),
            extended_types: IndexMap::new(),
            referred_types: IndexMap::new(),
            elements: IndexMap::new(),
            referred_elements: IndexMap::new(),
            documentation: IndexMap::new(),
            keys: IndexMap::new(),
            keyrefs: IndexMap::new(),
            uniques: IndexMap::new(),
            diagnostics: Vec::new(),
            queue: VecDeque::new(),
            block_loop: false,
        };
        state.read_files.insert(source.location);
        state.queue("", document, true);
        while let Some(item) = state.queue.pop_front() {
            if item.deferred_element {
                state.deferred_element(&item.path, item.node)?;
            } else {
                state.read(&item.path, item.node, item.extend_path)?;
            }
        }
        state.finish()
    }
}

/// Loads a single in-memory schema file; includes cannot be resolved.
impl FromStr for SchemaIndex {
    type Err = SchemaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let resolver = MemoryResolver::new().with("schema.xsd", text);
        SchemaLoader::new(resolver).load("schema.xsd")
    }
}

fn first_top_level_element(nodes: &SchemaNodes, document: SchemaNodeId) -> Option<String> {
    let schema = nodes.child(document, &NodeKind::Schema)?;
    nodes
        .children_of_kind(schema, &NodeKind::Element)
        .find_map(|element| nodes.attribute(element, "name"))
        .map(str::to_string)
}

struct LoadState<'r, R> {
    resolver: &'r R,
    nodes: SchemaNodes,
    root: Option<SchemaNodeId>,
    root_name: String,
    read_files: IndexSet<String>,
    types: IndexMap<String, SchemaNodeId>,
    extended_types: IndexMap<String, IndexSet<String>>,
    referred_types: IndexMap<String, IndexSet<String>>,
    elements: IndexMap<String, SchemaNodeId>,
    referred_elements: IndexMap<String, IndexSet<String>>,
    documentation: IndexMap<String, String>,
    keys: IndexMap<String, ConstraintDef>,
    keyrefs: IndexMap<String, ConstraintDef>,
    uniques: IndexMap<String, ConstraintDef>,
    diagnostics: Vec<SchemaDiagnostic>,
    queue: VecDeque<QueueItem>,
    block_loop: bool,
}

impl<R: SourceResolver> LoadState<'_, R> {
    fn queue(&mut self, path: &str, node: SchemaNodeId, extend_path: bool) {
        trace!(path, node = node.0, extend_path, "queue");
        self.queue.push_back(QueueItem {
            path: path.to_string(),
            node,
            extend_path,
            deferred_element: false,
        });
    }

    fn defer_element(&mut self, path: &str, node: SchemaNodeId) {
        trace!(path, node = node.0, "defer element");
        self.queue.push_back(QueueItem {
            path: path.to_string(),
            node,
            extend_path: true,
            deferred_element: true,
        });
    }

    /// All named types of all files are registered by the time the first
    /// queue unit is done, so a type still missing here does not exist.
    fn deferred_element(&mut self, path: &str, node: SchemaNodeId) -> Result<(), SchemaError> {
        if let Some(type_name) = self.attr(node, "type")
            && let Some(referred) = self.types.get(&type_name).copied()
        {
            let name = self.attr(node, "name").unwrap_or_default();
            self.queue(&path::join(path, &name), referred, false);
        }
        self.read(path, node, true)
    }

    fn attr(&self, node: SchemaNodeId, name: &str) -> Option<String> {
        self.nodes.attribute(node, name).map(str::to_string)
    }

    fn read(&mut self, path: &str, node: SchemaNodeId, extend_path: bool) -> Result<(), SchemaError> {
        if path::is_recursive(path) {
            warn!(path, "recursion found, further expansion is halted");
            self.diagnostics.push(SchemaDiagnostic::RecursionHalted {
                path: path.to_string(),
            });
            return Ok(());
        }

        if self.nodes.kind(node) == &NodeKind::Extension {
            let base = self.attr(node, "base").unwrap_or_default();
            if !base.starts_with("xsd:") {
                match self.types.get(&base).copied() {
                    None => {
                        if self.block_loop {
                            return Ok(());
                        }
                        // the base type is declared later, try again once it is known
                        self.block_loop = true;
                        self.queue(path, node, false);
                    }
                    Some(base_node) => self.queue(path, base_node, false),
                }
            }
            let derived = self.extended_types.entry(base).or_default();
            if !derived.insert(path.to_string()) {
                return Ok(());
            }
        }
        self.block_loop = false;

        let mut next_path = path.to_string();
        let mut next_node = node;
        if self.nodes.kind(node) == &NodeKind::Element && self.nodes.node(node).has_attributes() {
            if let Some(name) = self.attr(node, "name") {
                if name == self.root_name && self.root.is_none() {
                    self.root = Some(node);
                }
                if extend_path {
                    next_path = path::join(&next_path, &name);
                }
                self.elements.insert(next_path.clone(), node);
            }
            if let Some(reference) = self.attr(node, "ref") {
                match self.elements.get(&reference).copied() {
                    Some(referred) => {
                        next_node = referred;
                        if extend_path {
                            next_path = path::join(&next_path, &reference);
                        }
                        self.elements.insert(next_path.clone(), referred);
                    }
                    None => {
                        debug!(path, reference, "element reference not loaded");
                        self.diagnostics.push(SchemaDiagnostic::ElementNotFound {
                            name: reference,
                            path: path.to_string(),
                        });
                        return Ok(());
                    }
                }
            }
        }

        if self.nodes.kind(next_node).is_type_definition()
            && let Some(name) = self.attr(next_node, "name")
        {
            if extend_path {
                next_path = path::join(&next_path, &name);
            }
            self.types.insert(name, next_node);
        }

        let children = self.nodes.children(next_node).to_vec();
        for child in children {
            match self.nodes.kind(child) {
                NodeKind::Include => self.include(&next_path, child)?,
                NodeKind::Element => self.element(&next_path, child)?,
                NodeKind::Attribute => self.attribute(&next_path, child)?,
                NodeKind::Documentation => self.documentation(&next_path, child),
                NodeKind::Union => self.union(&next_path, child)?,
                NodeKind::Key => self.constraint(&next_path, child, ConstraintCategory::Key),
                NodeKind::Keyref => self.constraint(&next_path, child, ConstraintCategory::KeyRef),
                NodeKind::Unique => self.constraint(&next_path, child, ConstraintCategory::Unique),
                _ => self.read(&next_path, child, true)?,
            }
        }
        Ok(())
    }

    fn include(&mut self, path: &str, node: SchemaNodeId) -> Result<(), SchemaError> {
        let Some(location) = self.attr(node, "schemaLocation") else {
            return Ok(());
        };
        let base = self.nodes.file_of(node).to_string();
        let source = self.resolver.resolve(Some(&base), &location)?;
        if !self.read_files.insert(source.location.clone()) {
            trace!(location = %source.location, "include already read");
            return Ok(());
        }
        debug!(location = %source.location, "reading include");
        let document = parse_schema(&mut self.nodes, &source.location, &source.content)?;
        self.read(path, document, true)
    }

    fn element(&mut self, path: &str, node: SchemaNodeId) -> Result<(), SchemaError> {
        if self.attr(node, "ref").is_some() {
            return self.reference(path, node);
        }
        if let Some(type_name) = self.attr(node, "type")
            && !type_name.starts_with("xsd:")
        {
            let name = self.attr(node, "name").unwrap_or_default();
            let element_path = path::join(path, &name);
            self.referred_types
                .entry(type_name.clone())
                .or_default()
                .insert(element_path.clone());
            match self.types.get(&type_name).copied() {
                // read the element once its type is known
                None => {
                    self.defer_element(path, node);
                    return Ok(());
                }
                Some(referred) => self.queue(&element_path, referred, false),
            }
        }
        self.read(path, node, true)
    }

    fn reference(&mut self, path: &str, node: SchemaNodeId) -> Result<(), SchemaError> {
        let reference = self.attr(node, "ref").unwrap_or_default();
        if reference == "xi:include" {
            return Ok(());
        }
        self.referred_elements
            .entry(reference.clone())
            .or_default()
            .insert(path.to_string());
        if self.elements.contains_key(&reference) {
            self.read(path, node, true)
        } else {
            self.queue(path, node, true);
            Ok(())
        }
    }

    fn attribute(&mut self, path: &str, node: SchemaNodeId) -> Result<(), SchemaError> {
        if let Some(type_name) = self.attr(node, "type") {
            let name = self.attr(node, "name").unwrap_or_default();
            self.referred_types
                .entry(type_name)
                .or_default()
                .insert(format!("{path}.{name}"));
        }
        self.read(path, node, true)
    }

    fn documentation(&mut self, path: &str, node: SchemaNodeId) {
        if let Some(text) = &self.nodes.node(node).text {
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            self.documentation.insert(path.to_string(), text);
        }
    }

    fn union(&mut self, path: &str, node: SchemaNodeId) -> Result<(), SchemaError> {
        let members = self.attr(node, "memberTypes").unwrap_or_default();
        for member in members.split_whitespace() {
            self.referred_types
                .entry(member.to_string())
                .or_default()
                .insert(path.to_string());
        }
        self.read(path, node, true)
    }

    fn constraint(&mut self, path: &str, node: SchemaNodeId, category: ConstraintCategory) {
        if !path.starts_with(self.root_name.as_str()) {
            return;
        }
        let name = self.attr(node, "name").unwrap_or_default();
        let selector = self
            .nodes
            .child(node, &NodeKind::Selector)
            .and_then(|selector| self.attr(selector, "xpath"))
            .unwrap_or_default();
        let fields = self
            .nodes
            .children_of_kind(node, &NodeKind::Field)
            .filter_map(|field| self.nodes.attribute(field, "xpath"))
            .map(str::to_string)
            .collect();
        let def = ConstraintDef {
            category,
            name: name.clone(),
            context: path.to_string(),
            node,
            selector,
            fields,
            refer: self.attr(node, "refer"),
        };
        let full_path = format!("{path}.{name}");
        trace!(%full_path, ?category, "constraint");
        match category {
            ConstraintCategory::Key => self.keys.insert(full_path, def),
            ConstraintCategory::KeyRef => self.keyrefs.insert(full_path, def),
            ConstraintCategory::Unique => self.uniques.insert(full_path, def),
        };
    }

    fn finish(mut self) -> Result<SchemaIndex, SchemaError> {
        // elements with a named type stand for that type from now on
        let elements: Vec<(String, SchemaNodeId)> =
            self.elements.iter().map(|(k, v)| (k.clone(), *v)).collect();
        for (element_path, node) in elements {
            let Some(type_name) = self.attr(node, "type") else { continue };
            if type_name.starts_with("xsd:") {
                continue;
            }
            match self.types.get(&type_name).copied() {
                Some(type_node) => {
                    self.elements.insert(element_path, type_node);
                }
                None => self.diagnostics.push(SchemaDiagnostic::TypeNotFound {
                    name: type_name,
                    path: element_path,
                }),
            }
        }

        let root = self.root.ok_or_else(|| SchemaError::RootNotFound {
            name: self.root_name.clone(),
        })?;
        let mut index = SchemaIndex {
            nodes: self.nodes,
            root,
            root_name: self.root_name,
            read_files: self.read_files,
            types: self.types,
            extended_types: self.extended_types,
            referred_types: self.referred_types,
            elements: self.elements,
            referred_elements: self.referred_elements,
            documentation: self.documentation,
            keys: self.keys,
            keyrefs: self.keyrefs,
            uniques: self.uniques,
            diagnostics: Vec::new(),
        };
        let mut diagnostics = self.diagnostics;
        diagnostics.extend(diagnostics::check(&index));
        index.diagnostics = diagnostics;

        info!(
            root = %index.root_name,
            files = index.read_files.len(),
            elements = index.elements.len(),
            types = index.types.len(),
            extended_types = index.extended_types.len(),
            documentations = index.documentation.len(),
            keys = index.keys.len(),
            keyrefs = index.keyrefs.len(),
            uniques = index.uniques.len(),
            diagnostics = index.diagnostics.len(),
            "schema loaded"
        );
        Ok(index)
    }
}
