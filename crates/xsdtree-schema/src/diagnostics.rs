//! Consistency checks run after loading.
//!
//! None of these are fatal. They point at schema constructs that are
//! probably mistakes: types nobody uses, keyrefs to keys that do not exist,
//! selectors that do not select anything.

use std::fmt;

use indexmap::IndexSet;
use thiserror::Error;
use tracing::warn;

use crate::index::{ConstraintCategory, ConstraintDef, SchemaIndex};
use crate::node::{NodeKind, SchemaNodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaDiagnostic {
    #[error("type '{name}' is defined but never extended or referred to")]
    UnusedType { name: String },
    #[error("element '{path}' is defined but never referred to, nor is it a type")]
    UnreferencedElement { path: String },
    #[error("keyref {keyref} refers to non existing key {key}")]
    MissingKey { keyref: String, key: String },
    #[error("{category} {name} ({selector}) not found among elements")]
    SelectorNotFound {
        category: ConstraintCategory,
        name: String,
        selector: String,
    },
    #[error("{category} {name} ({selector}) points to non existing field '{field}'")]
    FieldNotFound {
        category: ConstraintCategory,
        name: String,
        selector: String,
        field: String,
    },
    #[error("type '{name}' is extended but was not found")]
    ExtendedTypeNotFound { name: String },
    #[error("type '{name}' of element {path} was not found")]
    TypeNotFound { name: String, path: String },
    #[error("element '{name}' referred to at {path} was not found")]
    ElementNotFound { name: String, path: String },
    #[error("recursion found at {path}, further expansion is halted")]
    RecursionHalted { path: String },
}

impl fmt::Display for ConstraintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintCategory::Key => "Key",
            ConstraintCategory::KeyRef => "Keyref",
            ConstraintCategory::Unique => "Unique",
        })
    }
}

/// Runs all post-load checks on a fully indexed schema.
pub(crate) fn check(index: &SchemaIndex) -> Vec<SchemaDiagnostic> {
    let mut out = Vec::new();
    unused_types(index, &mut out);
    unreferenced_elements(index, &mut out);
    for def in index.keys().values().chain(index.uniques().values()) {
        check_key_or_unique(index, def, &mut out);
    }
    for def in index.keyrefs().values() {
        check_keyref(index, def, &mut out);
    }
    for name in index.extended_types().keys() {
        if !name.starts_with("xsd:") && index.type_def(name).is_none() {
            out.push(SchemaDiagnostic::ExtendedTypeNotFound { name: name.clone() });
        }
    }
    for diagnostic in &out {
        warn!(%diagnostic, "schema diagnostic");
    }
    out
}

fn unused_types(index: &SchemaIndex, out: &mut Vec<SchemaDiagnostic>) {
    let mut all: IndexSet<&String> = index.types().keys().collect();
    for used in index.extended_types().keys().chain(index.referred_types().keys()) {
        all.retain(|name| !name.starts_with(used.as_str()));
    }
    out.extend(all.into_iter().map(|name| SchemaDiagnostic::UnusedType { name: name.clone() }));
}

fn unreferenced_elements(index: &SchemaIndex, out: &mut Vec<SchemaDiagnostic>) {
    let mut all: IndexSet<&String> = index.elements().keys().collect();
    for used in index.referred_elements().keys().chain(index.types().keys()) {
        all.retain(|path| !path.starts_with(used.as_str()));
    }
    all.retain(|path| !path.starts_with(index.root_name()));
    out.extend(
        all.into_iter()
            .map(|path| SchemaDiagnostic::UnreferencedElement { path: path.clone() }),
    );
}

fn check_key_or_unique(index: &SchemaIndex, def: &ConstraintDef, out: &mut Vec<SchemaDiagnostic>) {
    for selector in def.selector.split('|') {
        let (path, selected) = match selector.strip_prefix(".//") {
            None => {
                let path = format!("{}.{}", def.context, selector.replace('/', "."));
                let selected = index.element(&path);
                (path, selected)
            }
            Some(rest) => {
                // intermediate layers, e.g. Ots.{...}.GtuTypes.GtuType
                let path = format!("{}.{{...}}.{}", def.context, rest.replace('/', "."));
                let suffix = rest.replace('/', ".");
                let selected = index
                    .elements()
                    .iter()
                    .find(|(element_path, _)| {
                        element_path.starts_with(&def.context) && element_path.ends_with(&suffix)
                    })
                    .map(|(_, node)| *node);
                (path, selected)
            }
        };
        let Some(selected) = selected else {
            out.push(SchemaDiagnostic::SelectorNotFound {
                category: def.category,
                name: def.name.clone(),
                selector: path,
            });
            continue;
        };
        for field in &def.fields {
            let found = field.split('|').any(|xpath| match xpath.strip_prefix('@') {
                Some(attribute) => index.has_element_attribute(selected, attribute),
                None => follow_xpath(index, selected, xpath),
            });
            if !found {
                out.push(SchemaDiagnostic::FieldNotFound {
                    category: def.category,
                    name: def.name.clone(),
                    selector: path.clone(),
                    field: field.clone(),
                });
            }
        }
    }
}

fn check_keyref(index: &SchemaIndex, def: &ConstraintDef, out: &mut Vec<SchemaDiagnostic>) {
    let refer = def.refer.clone().unwrap_or_default();
    if !index.keys().values().any(|key| key.name == refer) {
        out.push(SchemaDiagnostic::MissingKey {
            keyref: def.name.clone(),
            key: refer,
        });
    }
    let selected = selected_elements(index, &def.context, &def.selector);
    if selected.is_empty() {
        out.push(SchemaDiagnostic::SelectorNotFound {
            category: def.category,
            name: def.name.clone(),
            selector: def.selector.clone(),
        });
        return;
    }
    for node in selected {
        for field in &def.fields {
            let found = field.split('|').any(|xpath| follow_xpath(index, node, xpath));
            if !found {
                out.push(SchemaDiagnostic::FieldNotFound {
                    category: def.category,
                    name: def.name.clone(),
                    selector: def.selector.clone(),
                    field: field.clone(),
                });
            }
        }
    }
}

/// Schema nodes a selector may select from within `context`.
pub(crate) fn selected_elements(
    index: &SchemaIndex,
    context: &str,
    selector: &str,
) -> Vec<SchemaNodeId> {
    let mut nodes = Vec::new();
    for selector in selector.split('|') {
        let suffix = selector.trim_start_matches(".//").replace('/', ".");
        let selected = if selector.starts_with(".//") {
            index
                .elements()
                .iter()
                .find(|(path, _)| path.starts_with(context) && path.ends_with(&suffix))
                .map(|(_, node)| *node)
        } else {
            index.element(&format!("{context}.{suffix}"))
        };
        match selected {
            Some(node) => nodes.push(node),
            None => {
                let root_prefix = format!("{}.", index.root_name());
                for (path, node) in index.elements() {
                    if (!path.starts_with(&root_prefix) && path.ends_with(&suffix))
                        || index.is_type(*node, &suffix)
                    {
                        nodes.push(*node);
                    }
                }
            }
        }
    }
    nodes
}

/// Whether the first step of `xpath` can be found from `selected`.
fn follow_xpath(index: &SchemaIndex, selected: SchemaNodeId, xpath: &str) -> bool {
    if let Some(attribute) = xpath.strip_prefix('@') {
        return index.has_element_attribute(selected, attribute);
    }
    let kind = index.kind(selected);
    if xpath == "." && matches!(kind, NodeKind::SimpleType | NodeKind::Element) {
        return true;
    }
    let name = xpath.split('/').next().unwrap_or(xpath);
    if index.attribute(selected, "name") == Some(name) {
        return true;
    }
    if matches!(
        kind,
        NodeKind::ComplexType | NodeKind::Sequence | NodeKind::Choice | NodeKind::All | NodeKind::Element
    ) {
        return index
            .children(selected)
            .iter()
            .any(|child| follow_xpath(index, *child, name));
    }
    false
}
