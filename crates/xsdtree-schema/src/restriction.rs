//! Simple type restrictions and value checks.
//!
//! Facets are collected from the most derived type towards its base, so a
//! facet declared by a derived type wins over the same facet of its base.
//! Patterns are the exception: every derivation step adds a pattern group
//! that must match on its own.

use regex::Regex;
use tracing::debug;

use crate::index::SchemaIndex;
use crate::node::{Facet, NodeKind, SchemaNodeId};

const MAX_DEPTH: usize = 32;

/// Facets and base type of a simple type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Restrictions {
    /// Built-in base type, e.g. `xsd:double`.
    pub base: Option<String>,
    pub enumerations: Vec<String>,
    /// One entry per derivation step; alternatives within a step are joined.
    pub patterns: Vec<String>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Member types of an `xsd:union`; a value must satisfy one of them.
    pub members: Vec<Restrictions>,
}

/// Whether a value is an expression `{...}`, which is not checked.
pub fn is_expression(value: &str) -> bool {
    value.starts_with('{') && value.ends_with('}')
}

impl Restrictions {
    pub fn is_empty(&self) -> bool {
        self == &Restrictions::default()
    }

    /// Values offered for selection: enumerations of this type and its
    /// union members, or `true`/`false` for booleans.
    pub fn options(&self) -> Vec<String> {
        if self.base.as_deref() == Some("xsd:boolean") && self.enumerations.is_empty() {
            return vec!["true".to_string(), "false".to_string()];
        }
        let mut options = self.enumerations.clone();
        for member in &self.members {
            for option in member.options() {
                if !options.contains(&option) {
                    options.push(option);
                }
            }
        }
        options
    }

    /// First violated restriction for `value`, if any.
    pub fn check(&self, value: &str) -> Option<String> {
        if !self.members.is_empty() {
            let mut first = None;
            for member in &self.members {
                match member.check(value) {
                    None => return None,
                    Some(message) => {
                        first.get_or_insert(message);
                    }
                }
            }
            return first;
        }
        if !self.enumerations.is_empty() && !self.enumerations.iter().any(|e| e == value) {
            return Some(format!(
                "Value '{value}' is not one of the allowed values [{}].",
                self.enumerations.join(", ")
            ));
        }
        for pattern in &self.patterns {
            match Regex::new(&format!("^(?:{})$", translate_pattern(pattern))) {
                Ok(regex) if !regex.is_match(value) => {
                    return Some(format!("Value '{value}' does not match pattern {pattern}."));
                }
                Ok(_) => {}
                Err(error) => debug!(pattern, %error, "pattern is not supported, skipping"),
            }
        }
        let chars = value.chars().count();
        if let Some(length) = self.length
            && chars != length
        {
            return Some(format!("Value '{value}' should have length {length}."));
        }
        if let Some(min) = self.min_length
            && chars < min
        {
            return Some(format!("Value '{value}' should have at least length {min}."));
        }
        if let Some(max) = self.max_length
            && chars > max
        {
            return Some(format!("Value '{value}' should have at most length {max}."));
        }
        if let Some(message) = self.check_base(value) {
            return Some(message);
        }
        self.check_bounds(value)
    }

    fn check_base(&self, value: &str) -> Option<String> {
        let base = self.base.as_deref()?;
        let local = base.strip_prefix("xsd:").unwrap_or(base);
        let valid = match local {
            "boolean" => matches!(value, "true" | "false" | "1" | "0"),
            "decimal" => value.parse::<f64>().is_ok_and(f64::is_finite),
            "double" | "float" => {
                matches!(value, "INF" | "-INF" | "NaN") || value.parse::<f64>().is_ok()
            }
            "integer" | "int" | "long" | "short" | "byte" => value.parse::<i128>().is_ok(),
            "nonNegativeInteger" | "unsignedLong" | "unsignedInt" | "unsignedShort" | "unsignedByte" => {
                value.parse::<i128>().is_ok_and(|v| v >= 0)
            }
            "positiveInteger" => value.parse::<i128>().is_ok_and(|v| v > 0),
            "nonPositiveInteger" => value.parse::<i128>().is_ok_and(|v| v <= 0),
            "negativeInteger" => value.parse::<i128>().is_ok_and(|v| v < 0),
            _ => true,
        };
        (!valid).then(|| format!("Value '{value}' is not a valid {base}."))
    }

    fn check_bounds(&self, value: &str) -> Option<String> {
        let bounds: [(&Option<String>, &str, fn(f64, f64) -> bool); 4] = [
            (&self.min_inclusive, "at least", |v, limit| v >= limit),
            (&self.max_inclusive, "at most", |v, limit| v <= limit),
            (&self.min_exclusive, "more than", |v, limit| v > limit),
            (&self.max_exclusive, "less than", |v, limit| v < limit),
        ];
        if bounds.iter().all(|(bound, _, _)| bound.is_none()) {
            return None;
        }
        let Ok(number) = value.parse::<f64>() else {
            return Some(format!("Value '{value}' is not a number."));
        };
        for (bound, label, holds) in bounds {
            let Some(bound) = bound else { continue };
            let Ok(limit) = bound.parse::<f64>() else { continue };
            if !holds(number, limit) {
                return Some(format!("Value '{value}' should be {label} {bound}."));
            }
        }
        None
    }
}

/// Rewrites XSD-only escapes into their `regex` equivalents.
fn translate_pattern(pattern: &str) -> String {
    pattern
        .replace("\\i", "[\\p{L}_:]")
        .replace("\\I", "[^\\p{L}_:]")
        .replace("\\c", "[\\p{L}\\p{N}._:\\-]")
        .replace("\\C", "[^\\p{L}\\p{N}._:\\-]")
}

impl SchemaIndex {
    /// Restrictions of the simple content of `node`, which may be an
    /// `xsd:element`, `xsd:attribute`, simple or complex type.
    pub fn restrictions(&self, node: SchemaNodeId) -> Restrictions {
        let mut restrictions = Restrictions::default();
        self.collect(node, &mut restrictions, 0);
        restrictions
    }

    /// Built-in base type of the simple content of `node`.
    pub fn base_type(&self, node: SchemaNodeId) -> Option<String> {
        self.restrictions(node).base
    }

    /// First problem with `value` as content of `node`.
    ///
    /// Empty values and expressions are not checked.
    pub fn report_invalid_value(&self, node: SchemaNodeId, value: Option<&str>) -> Option<String> {
        let value = value.filter(|v| !v.is_empty())?;
        if is_expression(value) {
            return None;
        }
        self.restrictions(node).check(value)
    }

    /// Like [`SchemaIndex::report_invalid_value`], but also reports an empty
    /// value for a required attribute without default.
    pub fn report_invalid_attribute_value(
        &self,
        attribute: SchemaNodeId,
        value: Option<&str>,
    ) -> Option<String> {
        let empty = value.is_none_or(str::is_empty);
        if empty
            && self.attribute(attribute, "use") == Some("required")
            && self.attribute(attribute, "default").is_none()
        {
            let name = self.attribute(attribute, "name").unwrap_or_default();
            return Some(format!("Attribute {name} is required."));
        }
        self.report_invalid_value(attribute, value)
    }

    fn collect(&self, node: SchemaNodeId, out: &mut Restrictions, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        match self.kind(node) {
            NodeKind::Element | NodeKind::Attribute => match self.attribute(node, "type") {
                Some(type_name) if type_name.starts_with("xsd:") => {
                    out.base.get_or_insert_with(|| type_name.to_string());
                }
                Some(type_name) => {
                    if let Some(type_node) = self.type_def(type_name) {
                        self.collect(type_node, out, depth + 1);
                    }
                }
                None => {
                    let inline = self
                        .child(node, &NodeKind::SimpleType)
                        .or_else(|| self.child(node, &NodeKind::ComplexType));
                    if let Some(inline) = inline {
                        self.collect(inline, out, depth + 1);
                    }
                }
            },
            NodeKind::SimpleType => {
                for child in self.children(node) {
                    match self.kind(*child) {
                        NodeKind::Restriction => self.collect_restriction(*child, out, depth + 1),
                        NodeKind::Union => self.collect_union(*child, out, depth + 1),
                        NodeKind::List => {
                            out.base.get_or_insert_with(|| "xsd:string".to_string());
                        }
                        _ => {}
                    }
                }
            }
            NodeKind::ComplexType => {
                let derivation = self.child(node, &NodeKind::SimpleContent).and_then(|content| {
                    self.child(content, &NodeKind::Restriction)
                        .or_else(|| self.child(content, &NodeKind::Extension))
                });
                if let Some(derivation) = derivation {
                    self.collect_restriction(derivation, out, depth + 1);
                }
            }
            NodeKind::Restriction | NodeKind::Extension => self.collect_restriction(node, out, depth + 1),
            _ => {}
        }
    }

    fn collect_restriction(&self, node: SchemaNodeId, out: &mut Restrictions, depth: usize) {
        let mut enumerations = Vec::new();
        let mut patterns = Vec::new();
        for child in self.children(node) {
            let NodeKind::Facet(facet) = self.kind(*child) else {
                if self.kind(*child) == &NodeKind::SimpleType {
                    self.collect(*child, out, depth + 1);
                }
                continue;
            };
            let Some(value) = self.attribute(*child, "value") else {
                continue;
            };
            let value = value.to_string();
            match facet {
                Facet::Enumeration => enumerations.push(value),
                Facet::Pattern => patterns.push(value),
                Facet::MinInclusive => set_once(&mut out.min_inclusive, value),
                Facet::MaxInclusive => set_once(&mut out.max_inclusive, value),
                Facet::MinExclusive => set_once(&mut out.min_exclusive, value),
                Facet::MaxExclusive => set_once(&mut out.max_exclusive, value),
                Facet::Length => set_once(&mut out.length, value.trim().parse().ok()),
                Facet::MinLength => set_once(&mut out.min_length, value.trim().parse().ok()),
                Facet::MaxLength => set_once(&mut out.max_length, value.trim().parse().ok()),
                Facet::WhiteSpace | Facet::TotalDigits | Facet::FractionDigits => {}
            }
        }
        if out.enumerations.is_empty() {
            out.enumerations = enumerations;
        }
        match patterns.len() {
            0 => {}
            1 => out.patterns.extend(patterns),
            _ => out.patterns.push(
                patterns
                    .iter()
                    .map(|p| format!("(?:{p})"))
                    .collect::<Vec<_>>()
                    .join("|"),
            ),
        }
        if let Some(base) = self.attribute(node, "base") {
            if base.starts_with("xsd:") {
                out.base.get_or_insert_with(|| base.to_string());
            } else if let Some(base_node) = self.type_def(base) {
                self.collect(base_node, out, depth + 1);
            }
        }
    }

    fn collect_union(&self, node: SchemaNodeId, out: &mut Restrictions, depth: usize) {
        for member in self.attribute(node, "memberTypes").unwrap_or_default().split_whitespace() {
            let mut restrictions = Restrictions::default();
            if member.starts_with("xsd:") {
                restrictions.base = Some(member.to_string());
            } else if let Some(type_node) = self.type_def(member) {
                self.collect(type_node, &mut restrictions, depth + 1);
            }
            out.members.push(restrictions);
        }
        for inline in self.nodes().children_of_kind(node, &NodeKind::SimpleType) {
            let mut restrictions = Restrictions::default();
            self.collect(inline, &mut restrictions, depth + 1);
            out.members.push(restrictions);
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: impl Into<Option<T>>) {
    if slot.is_none() {
        *slot = value.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <xsd:element name="Root">
    <xsd:complexType>
      <xsd:attribute name="Speed" type="PositiveSpeed" use="required"/>
      <xsd:attribute name="Mode" type="Mode"/>
      <xsd:attribute name="Flag" type="xsd:boolean" default="false"/>
      <xsd:attribute name="Either" type="SpeedOrMode"/>
    </xsd:complexType>
  </xsd:element>
  <xsd:simpleType name="Speed">
    <xsd:restriction base="xsd:double">
      <xsd:maxInclusive value="200"/>
    </xsd:restriction>
  </xsd:simpleType>
  <xsd:simpleType name="PositiveSpeed">
    <xsd:restriction base="Speed">
      <xsd:minExclusive value="0"/>
    </xsd:restriction>
  </xsd:simpleType>
  <xsd:simpleType name="Mode">
    <xsd:restriction base="xsd:string">
      <xsd:enumeration value="FAST"/>
      <xsd:enumeration value="SLOW"/>
    </xsd:restriction>
  </xsd:simpleType>
  <xsd:simpleType name="Code">
    <xsd:restriction base="xsd:string">
      <xsd:pattern value="[A-Z]{2}[0-9]+"/>
      <xsd:maxLength value="4"/>
    </xsd:restriction>
  </xsd:simpleType>
  <xsd:simpleType name="SpeedOrMode">
    <xsd:union memberTypes="Speed Mode"/>
  </xsd:simpleType>
</xsd:schema>"#;

    fn attribute(index: &SchemaIndex, name: &str) -> SchemaNodeId {
        let root = index.root();
        let complex = index.child(root, &NodeKind::ComplexType).expect("complex type");
        index
            .nodes()
            .children_of_kind(complex, &NodeKind::Attribute)
            .find(|a| index.attribute(*a, "name") == Some(name))
            .expect("attribute")
    }

    #[test]
    fn test_restrictions_follow_base_chain() {
        let index: SchemaIndex = SCHEMA.parse().expect("schema");
        let speed = attribute(&index, "Speed");
        let restrictions = index.restrictions(speed);
        assert_eq!(restrictions.base.as_deref(), Some("xsd:double"));
        assert_eq!(restrictions.min_exclusive.as_deref(), Some("0"));
        assert_eq!(restrictions.max_inclusive.as_deref(), Some("200"));
    }

    #[test]
    fn test_report_invalid_attribute_value() {
        let index: SchemaIndex = SCHEMA.parse().expect("schema");
        let speed = attribute(&index, "Speed");
        assert_eq!(
            index.report_invalid_attribute_value(speed, None),
            Some("Attribute Speed is required.".to_string())
        );
        assert_eq!(index.report_invalid_attribute_value(speed, Some("50")), None);
        assert_eq!(
            index.report_invalid_attribute_value(speed, Some("0")),
            Some("Value '0' should be more than 0.".to_string())
        );
        assert_eq!(
            index.report_invalid_attribute_value(speed, Some("fast")),
            Some("Value 'fast' is not a valid xsd:double.".to_string())
        );
        assert_eq!(index.report_invalid_attribute_value(speed, Some("{v * 2}")), None);
    }

    #[test]
    fn test_enumeration_and_options() {
        let index: SchemaIndex = SCHEMA.parse().expect("schema");
        let mode = attribute(&index, "Mode");
        assert_eq!(index.restrictions(mode).options(), vec!["FAST", "SLOW"]);
        assert_eq!(index.report_invalid_value(mode, Some("FAST")), None);
        assert!(index.report_invalid_value(mode, Some("MEDIUM")).is_some());
        assert_eq!(index.report_invalid_attribute_value(mode, None), None);

        let flag = attribute(&index, "Flag");
        assert_eq!(index.restrictions(flag).options(), vec!["true", "false"]);
    }

    #[test]
    fn test_pattern_and_length() {
        let index: SchemaIndex = SCHEMA.parse().expect("schema");
        let code = index.type_def("Code").expect("Code");
        assert_eq!(index.report_invalid_value(code, Some("AB12")), None);
        assert_eq!(
            index.report_invalid_value(code, Some("A12")),
            Some("Value 'A12' does not match pattern [A-Z]{2}[0-9]+.".to_string())
        );
        assert_eq!(
            index.report_invalid_value(code, Some("AB123")),
            Some("Value 'AB123' should have at most length 4.".to_string())
        );
    }

    #[test]
    fn test_union_accepts_any_member() {
        let index: SchemaIndex = SCHEMA.parse().expect("schema");
        let either = attribute(&index, "Either");
        assert_eq!(index.report_invalid_value(either, Some("SLOW")), None);
        assert_eq!(index.report_invalid_value(either, Some("120")), None);
        assert!(index.report_invalid_value(either, Some("300")).is_some());
        assert_eq!(index.restrictions(either).options(), vec!["FAST", "SLOW"]);
    }
}
