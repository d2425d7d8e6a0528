//! Reading and writing XML documents.

mod load;
mod save;

use xsdtree_schema::parse::XI_NS;

pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Element name as tree nodes know it: the local name, or `xi:<local>` for
/// XInclude elements.
pub(crate) fn xml_name(node: roxmltree::Node<'_, '_>) -> String {
    let local = node.tag_name().name();
    if node.tag_name().namespace() == Some(XI_NS) {
        format!("xi:{local}")
    } else {
        local.to_string()
    }
}
