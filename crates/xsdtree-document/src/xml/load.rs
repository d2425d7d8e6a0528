use tracing::{debug, warn};

use super::{XSI_NS, xml_name};
use crate::document::{NodeId, XsdTree};
use crate::error::{TreeError, XmlError};
use crate::event::Origin;

/// Read position shared with nested sequence loads.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    xml: usize,
    child: usize,
}

impl XsdTree {
    /// Loads an XML document into the tree, starting at the root node.
    ///
    /// Elements that do not fit the schema are skipped with a warning.
    pub fn load_xml(&mut self, text: &str) -> Result<(), XmlError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let document = roxmltree::Document::parse_with_options(text, options)?;
        let element = document.root_element();
        let found = xml_name(element);
        let expected = self.node_name(self.root());
        if found != expected {
            return Err(XmlError::RootMismatch { expected, found });
        }
        self.load_element(self.root(), element, Origin::Direct)?;
        Ok(())
    }

    /// Activates `id` and fills it from `element`. Events are emitted with
    /// `origin`, so content read as part of another operation stays
    /// `Cascade`.
    pub(crate) fn load_element(
        &mut self,
        id: NodeId,
        element: roxmltree::Node<'_, '_>,
        origin: Origin,
    ) -> Result<(), TreeError> {
        self.set_active_inner(id, origin)?;

        let text: String = element
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .filter(|text| !text.trim().is_empty())
            .collect();
        if !text.is_empty() {
            self.replace_value_inner(id, &text, origin);
        }

        for attribute in element.attributes() {
            if attribute.namespace() == Some(XSI_NS) {
                if attribute.name() == "schemaLocation" && id == self.root() {
                    self.schema_location = Some(attribute.value().to_string());
                }
                continue;
            }
            let Some(index) = self.attribute_index(id, attribute.name()) else {
                warn!(
                    attribute = attribute.name(),
                    value = attribute.value(),
                    node = %self.short_string(id),
                    "unable to load attribute"
                );
                continue;
            };
            self.set_attribute_value_inner(id, index, attribute.value(), origin)?;
        }

        self.assure_children(id)?;
        let elements: Vec<_> = element.children().filter(|child| child.is_element()).collect();
        let mut cursor = Cursor { xml: 0, child: 0 };
        self.load_children(id, &mut cursor, &elements, false, origin)?;

        if self.is_included(id) {
            // included content is read-only, drop placeholders it does not use
            let names: Vec<String> = elements.iter().map(|child| xml_name(*child)).collect();
            let mut index = 0;
            while index < self.loaded_children(id).len() {
                let child = self.loaded_children(id)[index];
                let mut relevant = false;
                for name in &names {
                    if self.is_relevant_node(child, name)? {
                        relevant = true;
                        break;
                    }
                }
                if relevant {
                    index += 1;
                } else if let Some(children) = self.node_mut(id).children.as_mut() {
                    children.remove(index);
                }
            }
        }
        Ok(())
    }

    /// Matches XML elements to children in order. A child matching again
    /// right after itself is repeated with `add`. When the children run out
    /// while elements remain, another pass starts if the content model
    /// repeats.
    fn load_children(
        &mut self,
        id: NodeId,
        cursor: &mut Cursor,
        elements: &[roxmltree::Node<'_, '_>],
        sub_sequence: bool,
        origin: Origin,
    ) -> Result<(), TreeError> {
        let mut loaded: Vec<NodeId> = Vec::new();
        let mut passes = 0;
        let max_passes = self.max_passes(id);
        let mut loaded_during_pass = 0;
        let mut index_xml = cursor.xml;
        let mut child_index = cursor.child;
        while index_xml < elements.len() {
            let element = elements[index_xml];
            let name = xml_name(element);
            if self.is_xi_include(id) && name == "xi:fallback" {
                let href = element
                    .children()
                    .find(|child| child.is_element())
                    .and_then(|include| include.attribute("href"));
                if let Some(href) = href {
                    self.set_attribute_value_inner(id, 1, href, origin)?;
                }
                index_xml += 1;
                continue;
            }

            let children = self.loaded_children(id).to_vec();
            if child_index > 0 && self.is_relevant_node(children[child_index - 1], &name)? {
                let next_matches = match children.get(child_index) {
                    Some(next) => self.is_relevant_node(*next, &name)?,
                    None => false,
                };
                if !next_matches {
                    if let Err(error) = self.add_inner(children[child_index - 1], origin) {
                        warn!(%name, %error, "failing to load element");
                        index_xml += 1;
                        continue;
                    }
                }
            } else {
                while child_index < children.len()
                    && (!self.is_relevant_node(children[child_index], &name)?
                        || loaded.contains(&children[child_index]))
                {
                    child_index += 1;
                }
                if child_index >= children.len() {
                    if loaded_during_pass == 0 {
                        warn!(%name, "failing to load element, it is not a valid node");
                        index_xml += 1;
                        child_index = 0;
                        continue;
                    }
                    passes += 1;
                    if passes >= max_passes {
                        if !sub_sequence {
                            warn!(%name, "failing to load element, maximum number of passes reached");
                        }
                        cursor.xml = index_xml;
                        return Ok(());
                    }
                    child_index = 0;
                    loaded_during_pass = 0;
                    continue;
                }
            }

            let relevant = self.loaded_children(id)[child_index];
            let mut next_xml = index_xml + 1;
            match self.choice(relevant) {
                None if self.is_sequence(relevant) => {
                    let mut sub = Cursor {
                        xml: index_xml,
                        child: 0,
                    };
                    self.load_children(relevant, &mut sub, elements, true, origin)?;
                    loaded.push(relevant);
                    next_xml = sub.xml;
                }
                None => {
                    self.load_element(relevant, element, origin)?;
                    loaded.push(relevant);
                }
                Some(choice) => {
                    let options = self.node(choice).options.clone();
                    for &option in &options {
                        let mut option_set = false;
                        if self.is_sequence(option) {
                            self.node_mut(option).active = true;
                            self.assure_children(option)?;
                            for child in self.loaded_children(option).to_vec() {
                                if self.is_relevant_node(child, &name)? {
                                    self.set_option_inner(relevant, option, origin)?;
                                    let mut sub = Cursor {
                                        xml: index_xml,
                                        child: 0,
                                    };
                                    self.load_children(option, &mut sub, elements, true, origin)?;
                                    loaded.push(option);
                                    next_xml = sub.xml;
                                    option_set = true;
                                    break;
                                }
                            }
                        }
                        if !option_set && self.node_name(option) == name {
                            self.set_option_inner(relevant, option, origin)?;
                            self.load_element(option, element, origin)?;
                            loaded.push(option);
                            option_set = true;
                        }
                        if option_set {
                            for &other in &options {
                                if other != option {
                                    self.set_active_inner(other, Origin::Cascade)?;
                                }
                            }
                            break;
                        }
                    }
                }
            }
            loaded_during_pass += 1;
            child_index += 1;
            cursor.child = child_index;
            index_xml = next_xml;
        }
        cursor.xml = index_xml;
        Ok(())
    }

    /// Number of passes over the children: the `maxOccurs` of the node's
    /// content sequence.
    fn max_passes(&self, id: NodeId) -> usize {
        let Some(node) = self.schema_node(id) else {
            return 1;
        };
        let schema = self.schema();
        let complex_type = if schema.kind(node) == &xsdtree_schema::NodeKind::ComplexType {
            Some(node)
        } else {
            schema.child(node, &xsdtree_schema::NodeKind::ComplexType)
        };
        let max = complex_type
            .and_then(|complex_type| schema.child(complex_type, &xsdtree_schema::NodeKind::Sequence))
            .and_then(|sequence| schema.attribute(sequence, "maxOccurs"));
        match max {
            Some("unbounded") => usize::MAX,
            Some(max) => max.parse().unwrap_or(1),
            None => 1,
        }
    }

    /// Whether an element named `name` belongs in `id`: by name, or through
    /// a sequence node or another option of its choice. Sequences are
    /// expanded to look inside.
    pub(crate) fn is_relevant_node(&mut self, id: NodeId, name: &str) -> Result<bool, TreeError> {
        if self.node_name(id) == name {
            return Ok(true);
        }
        let Some(choice) = self.choice(id) else {
            if self.is_sequence(id) {
                return self.any_child_relevant(id, name);
            }
            return Ok(false);
        };
        if self.node(choice).selected != Some(id) {
            return Ok(false);
        }
        for option in self.node(choice).options.clone() {
            if self.is_sequence(option) {
                if self.any_child_relevant(option, name)? {
                    return Ok(true);
                }
            } else if option != id && self.is_relevant_node(option, name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn any_child_relevant(&mut self, sequence: NodeId, name: &str) -> Result<bool, TreeError> {
        if !self.node(sequence).active {
            debug!(path = %self.path_string(sequence), "activating sequence to match elements");
            self.node_mut(sequence).active = true;
        }
        self.assure_children(sequence)?;
        for child in self.loaded_children(sequence).to_vec() {
            if self.is_relevant_node(child, name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
