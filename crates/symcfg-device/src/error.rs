//! Error types for device metadata operations.

use std::path::PathBuf;

use symcfg_core::ConfigError;

/// Errors that can occur while loading or querying device metadata.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading device files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device file not found.
    #[error("device file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A selector string could not be parsed.
    #[error("invalid selector {selector}: {detail}")]
    InvalidSelector { selector: String, detail: String },

    /// No node matched a selector.
    #[error("no metadata node matches {0}")]
    MissingNode(String),

    /// The node exists but lacks a required attribute.
    #[error("node {selector} has no attribute {attribute}")]
    MissingAttribute { selector: String, attribute: String },

    /// An attribute value could not be interpreted.
    #[error("malformed metadata at {selector}: {detail}")]
    Malformed { selector: String, detail: String },
}

/// Result type for device metadata operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

impl From<DeviceError> for ConfigError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::MissingNode(selector) => ConfigError::MissingMetadataNode(selector),
            DeviceError::MissingAttribute { selector, attribute } => {
                ConfigError::MissingMetadataNode(format!("{selector}:{attribute}"))
            }
            DeviceError::InvalidSelector { selector, detail }
            | DeviceError::Malformed { selector, detail } => {
                ConfigError::MalformedMetadata { selector, detail }
            }
            other => ConfigError::MalformedMetadata {
                selector: String::new(),
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_nodes_map_to_missing_metadata() {
        let err: ConfigError = DeviceError::MissingNode("/a/b".into()).into();
        assert_eq!(err, ConfigError::MissingMetadataNode("/a/b".into()));

        let err: ConfigError = DeviceError::MissingAttribute {
            selector: "/a".into(),
            attribute: "id".into(),
        }
        .into();
        assert_eq!(err, ConfigError::MissingMetadataNode("/a:id".into()));
    }

    #[test]
    fn malformed_keeps_selector() {
        let err: ConfigError = DeviceError::Malformed {
            selector: "/a".into(),
            detail: "bad mask".into(),
        }
        .into();
        assert!(matches!(
            err,
            ConfigError::MalformedMetadata { ref selector, .. } if selector == "/a"
        ));
    }
}
