//! Read-only device metadata for symcfg.
//!
//! A device description is a tree of tagged nodes with string attributes
//! (register groups, bitfields, enumerated value groups, interrupt vectors)
//! addressed by path-like selectors such as
//! `/avr-tools-device-file/modules/module@[name="RSTC"]`. Descriptions are
//! authored as `.device.toml` files and converted into that tree.

pub mod error;
pub mod metadata;
pub mod node;
pub mod parse;
pub mod selector;

pub use error::{DeviceError, Result};
pub use metadata::{DeviceMetadata, DeviceTree, Interrupt, ROOT_TAG};
pub use node::{parse_literal, Node};
pub use parse::{
    discover_devices, load_device_toml, parse_device_toml, validate_device, DeviceDescription,
};
pub use selector::Selector;
