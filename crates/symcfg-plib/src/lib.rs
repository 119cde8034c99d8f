//! Peripheral library components for symcfg.
//!
//! Each [`Component`] declares the symbols, recomputation rules and output
//! slots of one peripheral instance against a [`Session`](symcfg_core::Session),
//! reading register layouts from device metadata and host choices from
//! [`HostBindings`](symcfg_targets::HostBindings). A [`Project`] owns the
//! session, the device and the host bindings, and always starts with the
//! shared `core` instance, which also carries the interrupt controller.

pub mod capability;
pub mod cmsis;
pub mod component;
pub mod core_config;
pub mod environment;
pub mod evic;
pub mod nvic;
pub mod project;
pub mod rstc;
pub mod sdramc;
pub mod tmr1;

pub use capability::{capabilities, device_capabilities, modules_with, Capability};
pub use cmsis::Cmsis;
pub use component::{component, Component, COMPONENTS};
pub use core_config::CoreComponent;
pub use environment::Environment;
pub use project::Project;
pub use rstc::Rstc;
pub use sdramc::Sdramc;
pub use tmr1::Tmr1;
