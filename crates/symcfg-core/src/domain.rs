//! Declared value domains.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symbol::{SymbolKind, Value};

/// One entry of an enumerated value domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    /// Key stored as the symbol value.
    pub key: String,
    /// Numeric value the key encodes in hardware.
    pub value: u64,
    /// Human-readable description.
    pub description: String,
}

impl EnumOption {
    pub fn new(key: impl Into<String>, value: u64, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value,
            description: description.into(),
        }
    }
}

/// The set of values a symbol may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// Every value of the symbol's kind.
    Any,
    /// Inclusive integer range.
    Range { min: i64, max: i64 },
    /// Enumerated keys, in declaration order.
    Keys(Vec<EnumOption>),
    /// Unsigned value representable in the given number of bits.
    BitWidth(u32),
}

impl Domain {
    /// Build a key domain from plain strings, numbering them by position.
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Domain::Keys(
            keys.into_iter()
                .enumerate()
                .map(|(i, k)| {
                    let key = k.into();
                    EnumOption::new(key.clone(), i as u64, key)
                })
                .collect(),
        )
    }

    /// Whether a domain of this shape can be declared for `kind` at all.
    pub fn fits(&self, kind: SymbolKind) -> bool {
        matches!(
            (kind, self),
            (SymbolKind::Boolean, Domain::Any)
                | (SymbolKind::Integer, Domain::Any | Domain::Range { .. })
                | (SymbolKind::EnumKey, Domain::Keys(_))
                | (SymbolKind::Hex, Domain::Any | Domain::BitWidth(_))
                | (SymbolKind::String, Domain::Any)
                | (SymbolKind::Menu, Domain::Any)
        )
    }

    /// Whether `value` is admissible for a symbol of `kind` with this domain.
    pub fn admits(&self, kind: SymbolKind, value: &Value) -> bool {
        match (kind, value) {
            (SymbolKind::Boolean, Value::Bool(_)) => matches!(self, Domain::Any),
            (SymbolKind::Integer, Value::Int(v)) => match self {
                Domain::Any => true,
                Domain::Range { min, max } => min <= v && v <= max,
                _ => false,
            },
            (SymbolKind::EnumKey, Value::Key(k)) => self.option(k).is_some(),
            (SymbolKind::Hex, Value::Hex(v)) => match self {
                Domain::Any => true,
                Domain::BitWidth(width) => *width >= 64 || v >> width == 0,
                _ => false,
            },
            (SymbolKind::String, Value::Str(_)) => matches!(self, Domain::Any),
            (SymbolKind::Menu, Value::None) => matches!(self, Domain::Any),
            _ => false,
        }
    }

    /// Look up an enumerated option by key.
    pub fn option(&self, key: &str) -> Option<&EnumOption> {
        self.options().iter().find(|o| o.key == key)
    }

    /// Enumerated options, empty for non-key domains.
    pub fn options(&self) -> &[EnumOption] {
        match self {
            Domain::Keys(options) => options,
            _ => &[],
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Any => write!(f, "any"),
            Domain::Range { min, max } => write!(f, "[{min}..{max}]"),
            Domain::Keys(options) => {
                let keys: Vec<_> = options.iter().map(|o| o.key.as_str()).collect();
                write!(f, "{{{}}}", keys.join(", "))
            }
            Domain::BitWidth(width) => write!(f, "{width}-bit"),
        }
    }
}
