//! Errors raised while loading processor definitions and binding a host.

use std::path::PathBuf;

use crate::processor::Toolchain;

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `.target.toml` path that does not exist.
    #[error("target file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Neither a project target file nor a built-in processor has this name.
    #[error("unknown processor: '{0}'")]
    UnknownProcessor(String),

    #[error("processor '{processor}' supports no toolchain")]
    NoToolchain { processor: String },

    #[error("toolchain {toolchain} is not supported by {processor}")]
    UnsupportedToolchain {
        toolchain: Toolchain,
        processor: String,
    },

    #[error("memory target '{memory}' is not defined for {processor}")]
    UnknownMemoryTarget { memory: String, processor: String },

    /// Host clocks with a zero frequency.
    #[error("zero clock frequency: processor {processor_hz} Hz, master {master_hz} Hz")]
    InvalidClocks { processor_hz: u64, master_hz: u64 },
}

pub type Result<T> = std::result::Result<T, TargetError>;
