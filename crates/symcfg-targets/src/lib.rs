//! Processor definitions and host bindings for symcfg.
//!
//! A [`Processor`] describes what the host knows about the target before
//! any component is instantiated: architecture, supported toolchains,
//! memory targets, default clocks, the startup and linker templates and
//! per-toolchain compiler options.
//! [`HostBindings`] pins the choices for one configuration session.

pub mod error;
pub mod host;
pub mod parse;
pub mod processor;

pub use error::{Result, TargetError};
pub use host::HostBindings;
pub use parse::{
    discover_targets, find_processor, generate_template, load_processor_toml, parse_processor_toml,
    processor_to_toml, validate_processor, ValidationIssue,
};
pub use processor::{
    Architecture, Clocks, CompilerSetting, InterruptController, LinkerScript, MemoryTarget,
    Processor, StartupFile, Toolchain,
};
