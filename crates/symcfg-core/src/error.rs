//! Error types for the configuration core.

use crate::symbol::{SymbolId, SymbolKind};

/// Errors raised while declaring or propagating configuration symbols.
///
/// None of these are transient: the model is deterministic, so an error
/// aborts generation for the instance it names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("duplicate symbol id: {0}")]
    DuplicateSymbolId(SymbolId),

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("value {value} is outside the domain {domain} of {kind} symbol {symbol}")]
    DomainViolation {
        symbol: SymbolId,
        kind: SymbolKind,
        value: String,
        domain: String,
    },

    #[error("cycle detected involving symbol {0}")]
    CycleDetected(SymbolId),

    #[error("missing metadata node: {0}")]
    MissingMetadataNode(String),

    #[error("malformed metadata at {selector}: {detail}")]
    MalformedMetadata { selector: String, detail: String },

    #[error("ambiguous artifact selection for slot {slot}: {matches} descriptors active")]
    AmbiguousArtifactSelection { slot: String, matches: usize },

    #[error("symbol {0} is locked")]
    SymbolLocked(SymbolId),

    #[error("symbol {0} is computed by a rule and cannot be set directly")]
    DerivedSymbol(SymbolId),

    #[error("rule for {target} read {read}, which is not one of its upstream symbols")]
    UndeclaredRead { target: SymbolId, read: SymbolId },

    #[error("instance {instance} cannot bind a rule to foreign symbol {symbol}")]
    ForeignTarget { instance: String, symbol: SymbolId },

    #[error("duplicate instance id: {0}")]
    DuplicateInstance(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("generation for instance {0} was aborted")]
    InstanceAborted(String),

    #[error("recompute of {symbol} failed: {detail}")]
    Recompute { symbol: SymbolId, detail: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ConfigError {
    /// The configuration instance this error should be attributed to, if it
    /// names one.
    pub fn instance(&self) -> Option<&str> {
        match self {
            ConfigError::DuplicateSymbolId(id)
            | ConfigError::CycleDetected(id)
            | ConfigError::SymbolLocked(id)
            | ConfigError::DerivedSymbol(id)
            | ConfigError::DomainViolation { symbol: id, .. }
            | ConfigError::Recompute { symbol: id, .. }
            | ConfigError::UndeclaredRead { target: id, .. } => Some(id.instance()),
            ConfigError::AmbiguousArtifactSelection { slot, .. } => {
                slot.split_once('.').map(|(instance, _)| instance)
            }
            ConfigError::ForeignTarget { instance, .. }
            | ConfigError::DuplicateInstance(instance)
            | ConfigError::InstanceNotFound(instance)
            | ConfigError::InstanceAborted(instance) => Some(instance),
            ConfigError::SymbolNotFound(_)
            | ConfigError::MissingMetadataNode(_)
            | ConfigError::MalformedMetadata { .. }
            | ConfigError::Serialization(_) => None,
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
