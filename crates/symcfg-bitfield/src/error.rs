//! Error types for bitfield operations.

use symcfg_core::ConfigError;
use symcfg_device::DeviceError;

/// Errors raised while deriving or composing register bitfields.
#[derive(Debug, thiserror::Error)]
pub enum BitfieldError {
    /// The underlying metadata query failed.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A mask attribute does not describe one contiguous run of bits.
    #[error("bitfield {field} has non-contiguous mask {mask:#x}")]
    NonContiguousMask { field: String, mask: u64 },

    #[error("register {register} has no field {field}")]
    UnknownField { register: String, field: String },

    #[error("value {value} does not fit the {width}-bit field {field}")]
    ValueOutOfRange { field: String, value: u64, width: u32 },

    #[error("enumerated value {name} has non-numeric value {value:?}")]
    BadLiteral { name: String, value: String },

    #[error("group width must be between 1 and 64 bits, got {0}")]
    InvalidGroupWidth(u32),
}

/// Result type for bitfield operations.
pub type Result<T> = std::result::Result<T, BitfieldError>;

impl From<BitfieldError> for ConfigError {
    fn from(err: BitfieldError) -> Self {
        match err {
            BitfieldError::Device(e) => e.into(),
            other => ConfigError::MalformedMetadata {
                selector: String::new(),
                detail: other.to_string(),
            },
        }
    }
}
