//! Symbols: named, typed configuration values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, EnumOption};

/// Fully qualified symbol id: `<instance>.<NAME>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(instance: &str, name: &str) -> Self {
        Self(format!("{instance}.{name}"))
    }

    /// Parse a qualified id. Returns `None` when either half is empty.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once('.') {
            Some((instance, name)) if !instance.is_empty() && !name.is_empty() => {
                Some(Self(s.to_string()))
            }
            _ => None,
        }
    }

    /// The owning instance namespace.
    pub fn instance(&self) -> &str {
        self.0.split_once('.').map_or(&self.0, |(i, _)| i)
    }

    /// The name within the instance namespace.
    pub fn name(&self) -> &str {
        self.0.split_once('.').map_or("", |(_, n)| n)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable handle to a symbol in a store, captured at declaration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolRef(pub(crate) usize);

/// The type of value a symbol holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Boolean,
    Integer,
    EnumKey,
    Hex,
    String,
    /// Valueless grouping or comment node.
    Menu,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Boolean => "boolean",
            SymbolKind::Integer => "integer",
            SymbolKind::EnumKey => "enum-key",
            SymbolKind::Hex => "hex",
            SymbolKind::String => "string",
            SymbolKind::Menu => "menu",
        };
        f.write_str(s)
    }
}

/// A symbol value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type", content = "value")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Key(String),
    Hex(u64),
    Str(String),
    None,
}

impl Value {
    pub fn key(key: impl Into<String>) -> Self {
        Value::Key(key.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// The literal form handed to template rendering: lowercase `0x…` for
    /// hex values, decimal for integers.
    pub fn literal(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Key(k) => k.clone(),
            Value::Hex(v) => format!("{v:#x}"),
            Value::Str(s) => s.clone(),
            Value::None => String::new(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_hex(&self) -> Option<u64> {
        match self {
            Value::Hex(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Value::Key(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a textual override for a symbol of the given kind.
    pub fn parse_for(kind: SymbolKind, text: &str) -> Option<Value> {
        match kind {
            SymbolKind::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "y" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "n" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
            SymbolKind::Integer => text.parse().ok().map(Value::Int),
            SymbolKind::EnumKey => Some(Value::Key(text.to_string())),
            SymbolKind::Hex => {
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text);
                u64::from_str_radix(digits, 16).ok().map(Value::Hex)
            }
            SymbolKind::String => Some(Value::Str(text.to_string())),
            SymbolKind::Menu => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Key(k) => write!(f, "{k:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::None => f.write_str("none"),
            other => f.write_str(&other.literal()),
        }
    }
}

/// A configuration node.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub(crate) id: SymbolId,
    pub(crate) kind: SymbolKind,
    pub(crate) label: String,
    pub(crate) value: Value,
    pub(crate) default: Value,
    pub(crate) domain: Domain,
    pub(crate) visible: bool,
    pub(crate) locked: bool,
    pub(crate) parent: Option<SymbolRef>,
    pub(crate) upstream: Vec<SymbolRef>,
}

impl Symbol {
    pub fn id(&self) -> &SymbolId {
        &self.id
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The symbol's own visibility flag, ignoring its parents.
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn parent(&self) -> Option<SymbolRef> {
        self.parent
    }

    /// Symbols that feed rules targeting this symbol, in declaration order.
    pub fn upstream(&self) -> &[SymbolRef] {
        &self.upstream
    }

    /// The enumerated option currently selected, for key symbols.
    pub fn selected_option(&self) -> Option<&EnumOption> {
        self.value.as_key().and_then(|k| self.domain.option(k))
    }

    /// Numeric value of the selected enumerated option.
    pub fn selected_value(&self) -> Option<u64> {
        self.selected_option().map(|o| o.value)
    }
}

/// Declaration of a symbol, consumed by the store at creation.
#[derive(Debug, Clone)]
pub struct SymbolSpec {
    pub name: String,
    pub kind: SymbolKind,
    pub domain: Domain,
    pub value: Value,
    pub label: String,
    pub parent: Option<SymbolRef>,
    pub visible: bool,
    pub locked: bool,
}

impl SymbolSpec {
    fn new(name: &str, kind: SymbolKind, domain: Domain, value: Value) -> Self {
        Self {
            name: name.to_string(),
            kind,
            domain,
            value,
            label: String::new(),
            parent: None,
            visible: true,
            locked: false,
        }
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self::new(name, SymbolKind::Boolean, Domain::Any, Value::Bool(value))
    }

    pub fn integer(name: &str, value: i64) -> Self {
        Self::new(name, SymbolKind::Integer, Domain::Any, Value::Int(value))
    }

    pub fn hex(name: &str, value: u64) -> Self {
        Self::new(name, SymbolKind::Hex, Domain::Any, Value::Hex(value))
    }

    pub fn string(name: &str, value: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::String, Domain::Any, Value::Str(value.into()))
    }

    pub fn enum_key(name: &str, options: Vec<EnumOption>, value: impl Into<String>) -> Self {
        Self::new(
            name,
            SymbolKind::EnumKey,
            Domain::Keys(options),
            Value::Key(value.into()),
        )
    }

    pub fn menu(name: &str) -> Self {
        Self::new(name, SymbolKind::Menu, Domain::Any, Value::None)
    }

    /// Restrict an integer symbol to `[min, max]`.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.domain = Domain::Range { min, max };
        self
    }

    /// Restrict a hex symbol to `bits` bits.
    pub fn width(mut self, bits: u32) -> Self {
        self.domain = Domain::BitWidth(bits);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn parent(mut self, parent: SymbolRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_id_parts() {
        let id = SymbolId::new("sdramc0", "SDRAMC_MRS_VALUE");
        assert_eq!(id.instance(), "sdramc0");
        assert_eq!(id.name(), "SDRAMC_MRS_VALUE");
        assert_eq!(id.to_string(), "sdramc0.SDRAMC_MRS_VALUE");
        assert_eq!(
            SymbolId::parse("core.APP_START_ADDRESS"),
            Some(SymbolId::new("core", "APP_START_ADDRESS"))
        );
        assert_eq!(SymbolId::parse("nodot"), None);
        assert_eq!(SymbolId::parse(".X"), None);
    }

    #[test]
    fn hex_literal_is_lowercase_prefixed() {
        assert_eq!(Value::Hex(0x26F0_0000).literal(), "0x26f00000");
        assert_eq!(Value::Hex(0).literal(), "0x0");
        assert_eq!(Value::Int(43).literal(), "43");
    }

    #[test]
    fn parse_overrides_by_kind() {
        assert_eq!(Value::parse_for(SymbolKind::Boolean, "yes"), Some(Value::Bool(true)));
        assert_eq!(Value::parse_for(SymbolKind::Integer, "-4"), Some(Value::Int(-4)));
        assert_eq!(Value::parse_for(SymbolKind::Hex, "0x1F"), Some(Value::Hex(0x1f)));
        assert_eq!(Value::parse_for(SymbolKind::Hex, "zz"), None);
        assert_eq!(Value::parse_for(SymbolKind::Menu, "x"), None);
    }

    #[test]
    fn value_serializes_tagged() {
        let json = serde_json::to_string(&Value::Hex(16)).unwrap();
        assert_eq!(json, r#"{"type":"hex","value":16}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Hex(16));
    }

    #[test]
    fn spec_builder() {
        let spec =
            SymbolSpec::integer("SDRAMC_CR_CAS", 3).range(1, 3).label("CAS Latency").locked();
        assert_eq!(spec.domain, Domain::Range { min: 1, max: 3 });
        assert!(spec.locked);
        assert!(spec.visible);
        assert_eq!(spec.label, "CAS Latency");
    }
}
