//! Bitfield codec for symcfg.
//!
//! Pure helpers used by recomputation rules: composing and decomposing
//! register values from sub-field settings, deriving enumerated option sets
//! from value-group metadata, and the fixed arithmetic that places an
//! interrupt vector's flag and priority bits in indexed register groups.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod indexed;
pub mod options;

pub use codec::{decode_register, encode_register, update_field, Field};
pub use descriptor::{mask_span, BitfieldDescriptor, RegisterLayout};
pub use error::{BitfieldError, Result};
pub use indexed::{indexed_register_location, priority_location, IndexedLocation, PriorityLocation};
pub use options::{derive_enum_options, KeySource};
pub use symcfg_device::parse_literal as parse_numeric_literal;
