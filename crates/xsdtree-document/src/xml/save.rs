use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use xsdtree_schema::parse::XI_NS;

use super::XSI_NS;
use crate::document::{NodeId, XsdTree};
use crate::error::XmlError;

impl XsdTree {
    /// Writes the active part of the tree as an XML document.
    ///
    /// Content loaded from included files is not written; the include
    /// element referring to it is.
    pub fn save_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.save_node(&mut writer, self.root())?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn save_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), XmlError> {
        if !self.is_active(id) {
            return Ok(());
        }
        if self.is_xi_include(id) {
            return save_include(
                writer,
                self.attribute_value_at(id, 0),
                self.attribute_value_at(id, 1),
            );
        }
        if self.is_sequence(id) {
            // sequences do not add a level
            for &child in self.loaded_children(id) {
                self.save_node(writer, child)?;
            }
            return Ok(());
        }

        let name = match &self.options().namespace {
            Some(namespace) => format!("{}:{}", namespace.prefix, self.node_name(id)),
            None => self.node_name(id),
        };
        let mut start = BytesStart::new(name.as_str());
        if id == self.root() {
            if let Some(namespace) = &self.options().namespace {
                let key = format!("xmlns:{}", namespace.prefix);
                start.push_attribute((key.as_str(), namespace.uri.as_str()));
            }
            start.push_attribute(("xmlns:xi", XI_NS));
            if let Some(location) = self.schema_location() {
                start.push_attribute(("xmlns:xsi", XSI_NS));
                start.push_attribute(("xsi:schemaLocation", location));
            }
        }
        for attribute in self.attributes(id) {
            if let Some(value) = attribute.value.as_deref().filter(|v| !v.is_empty()) {
                start.push_attribute((attribute.name.as_str(), value));
            }
        }

        let value = self.value(id).filter(|value| !value.is_empty());
        let children: Vec<NodeId> = self
            .loaded_children(id)
            .iter()
            .copied()
            .filter(|child| !self.is_included(*child) && self.is_active(*child))
            .collect();
        if value.is_none() && children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        if let Some(value) = value {
            writer.write_event(Event::Text(BytesText::new(value)))?;
        }
        for child in children {
            self.save_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }
}

fn save_include(
    writer: &mut Writer<Vec<u8>>,
    file: Option<&str>,
    fallback: Option<&str>,
) -> Result<(), XmlError> {
    let mut start = BytesStart::new("xi:include");
    let Some(file) = file else {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    };
    start.push_attribute(("href", file));
    let Some(fallback) = fallback else {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    };
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Start(BytesStart::new("xi:fallback")))?;
    let mut include = BytesStart::new("xi:include");
    include.push_attribute(("href", fallback));
    writer.write_event(Event::Empty(include))?;
    writer.write_event(Event::End(BytesEnd::new("xi:fallback")))?;
    writer.write_event(Event::End(BytesEnd::new("xi:include")))?;
    Ok(())
}
