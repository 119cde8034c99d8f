//! CLI command implementations.

pub mod components;
pub mod device;
pub mod init;
pub mod resolve;
pub mod target;
