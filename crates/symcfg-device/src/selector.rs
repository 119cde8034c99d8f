//! Path-like node selectors: `/tag/tag@[attr="value"]/...`.
//!
//! The first step matches the root node; each following step picks the
//! first child with a matching tag (and attribute value, when filtered).

use std::fmt;
use std::str::FromStr;

use crate::error::{DeviceError, Result};
use crate::node::Node;

/// One step of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub tag: String,
    pub filter: Option<(String, String)>,
}

impl Step {
    fn matches(&self, node: &Node) -> bool {
        let filter = self.filter.as_ref().map(|(n, v)| (n.as_str(), v.as_str()));
        node.matches(&self.tag, filter)
    }
}

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    steps: Vec<Step>,
}

impl Selector {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |detail: &str| DeviceError::InvalidSelector {
            selector: text.to_string(),
            detail: detail.to_string(),
        };

        let mut steps = Vec::new();
        let mut chars = text.chars().peekable();
        if chars.next() != Some('/') {
            return Err(invalid("selector must start with '/'"));
        }
        loop {
            let mut tag = String::new();
            while let Some(&c) = chars.peek() {
                if c == '/' || c == '@' {
                    break;
                }
                tag.push(c);
                chars.next();
            }
            if tag.is_empty() {
                return Err(invalid("empty step"));
            }

            let mut filter = None;
            if chars.peek() == Some(&'@') {
                chars.next();
                if chars.next() != Some('[') {
                    return Err(invalid("expected '[' after '@'"));
                }
                let name: String = chars.by_ref().take_while(|c| *c != '=').collect();
                if name.is_empty() {
                    return Err(invalid("empty attribute name"));
                }
                if chars.next() != Some('"') {
                    return Err(invalid("attribute value must be double-quoted"));
                }
                let mut value = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed || chars.next() != Some(']') {
                    return Err(invalid("unterminated attribute filter"));
                }
                filter = Some((name.trim().to_string(), value));
            }
            steps.push(Step { tag, filter });

            match chars.next() {
                None => break,
                Some('/') => continue,
                Some(c) => return Err(invalid(&format!("unexpected '{c}'"))),
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Resolve against a root node.
    pub fn resolve<'n>(&self, root: &'n Node) -> Option<&'n Node> {
        let (first, rest) = self.steps.split_first()?;
        if !first.matches(root) {
            return None;
        }
        rest.iter().try_fold(root, |node, step| {
            node.children().iter().find(|c| step.matches(c))
        })
    }

    /// Extend with a child step.
    pub fn child(mut self, tag: &str, filter: Option<(&str, &str)>) -> Self {
        self.steps.push(Step {
            tag: tag.to_string(),
            filter: filter.map(|(n, v)| (n.to_string(), v.to_string())),
        });
        self
    }
}

impl FromStr for Selector {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{}", step.tag)?;
            if let Some((name, value)) = &step.filter {
                write!(f, "@[{name}=\"{value}\"]")?;
            }
        }
        Ok(())
    }
}
