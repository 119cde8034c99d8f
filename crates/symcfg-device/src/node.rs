//! Hierarchical metadata nodes.

use std::collections::BTreeMap;

/// One element of a device description: a tag, string attributes and
/// ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder: set an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder: set an attribute only when a value is present.
    pub fn with_opt_attr(self, name: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.with_attr(name, v),
            None => self,
        }
    }

    /// Builder: append a child.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append several children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// First child with the given tag and, if given, attribute value.
    pub fn child(&self, tag: &str, filter: Option<(&str, &str)>) -> Option<&Node> {
        self.children.iter().find(|c| c.matches(tag, filter))
    }

    pub(crate) fn matches(&self, tag: &str, filter: Option<(&str, &str)>) -> bool {
        self.tag == tag
            && filter.map_or(true, |(name, value)| self.attribute(name) == Some(value))
    }

    /// `name` attribute, falling back to the empty string.
    pub fn name(&self) -> &str {
        self.attribute("name").unwrap_or_default()
    }
}

/// Parse a metadata numeric literal, hexadecimal with a `0x` prefix or
/// decimal.
pub fn parse_literal(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
