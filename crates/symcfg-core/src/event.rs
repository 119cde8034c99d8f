//! Change events and rule effects.

use serde::{Deserialize, Serialize};

use crate::symbol::{SymbolId, SymbolRef, Value};

/// What caused a value change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cause {
    /// A write by the host.
    External,
    /// Evaluation of a rule during a settle pass.
    Settle,
    /// A rule reacting to a change of `trigger`.
    Rule { trigger: SymbolId },
}

/// A value change delivered to the rules subscribed to `symbol`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub symbol: SymbolRef,
    pub id: SymbolId,
    pub value: Value,
    pub previous: Value,
    pub cause: Cause,
}

/// The outcome of a recompute callback. It only ever applies to the
/// rule's own target symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Keep,
    Value(Value),
    Visible(bool),
}

impl From<Value> for Effect {
    fn from(value: Value) -> Self {
        Effect::Value(value)
    }
}
