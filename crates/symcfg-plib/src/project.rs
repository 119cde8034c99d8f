//! A configuration project: one device, one host, one session.

use log::{debug, info};
use symcfg_core::{CascadeReport, ConfigError, Result, Session, Snapshot, Value};
use symcfg_device::DeviceMetadata;
use symcfg_targets::HostBindings;

use crate::component::{component, Component};
use crate::core_config::{clock_enable_id, CoreComponent};
use crate::environment::Environment;

/// Owns the session together with the device metadata and host bindings
/// every component declares against.
///
/// The `core` instance is created up front; peripheral components are
/// added after it so they can read its symbols.
pub struct Project {
    device: Box<dyn DeviceMetadata>,
    host: HostBindings,
    session: Session,
}

impl Project {
    pub fn new(device: Box<dyn DeviceMetadata>, host: HostBindings) -> Result<Self> {
        let mut project = Self {
            device,
            host,
            session: Session::new(),
        };
        project.add(&CoreComponent, 0)?;
        Ok(project)
    }

    pub fn device(&self) -> &dyn DeviceMetadata {
        self.device.as_ref()
    }

    pub fn host(&self) -> &HostBindings {
        &self.host
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Instantiate `component` and return its instance id.
    ///
    /// A failed declaration aborts the instance. Once the instance is live
    /// the peripheral clock of its module is enabled in `core`, when the
    /// core declares one.
    pub fn add(&mut self, component: &dyn Component, index: u32) -> Result<String> {
        let id = component.instance_id(index);
        let env = Environment::new(self.device.as_ref(), &self.host);
        let mut builder = self.session.instantiate(&id, index)?;
        if let Err(err) = component.declare(&mut builder, &env) {
            return Err(builder.abort(err));
        }
        builder.finish()?;

        if let Some(module) = component.module() {
            let clock = clock_enable_id(module);
            if self.session.lookup(&clock).is_ok() {
                let report = self.session.set(&clock, Value::Bool(true))?;
                debug!("{id} enabled {clock}: {} symbols changed", report.changes.len());
            }
        }
        Ok(id)
    }

    /// Instantiate a component from the registry by name.
    pub fn add_named(&mut self, name: &str, index: u32) -> Result<String> {
        let component =
            component(name).ok_or_else(|| ConfigError::InstanceNotFound(name.to_string()))?;
        self.add(component.as_ref(), index)
    }

    /// Write a textual value to a symbol, parsed according to its kind.
    pub fn set(&mut self, id: &str, text: &str) -> Result<CascadeReport> {
        let symbol = self.session.symbol(self.session.lookup(id)?)?;
        let value =
            Value::parse_for(symbol.kind(), text).ok_or_else(|| ConfigError::DomainViolation {
                symbol: symbol.id().clone(),
                kind: symbol.kind(),
                value: text.to_string(),
                domain: symbol.domain().to_string(),
            })?;
        info!("set {id} = {value}");
        self.session.set(id, value)
    }

    /// Tear down a peripheral instance. The core cannot be removed.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        if id == CoreComponent.instance_id(0) {
            return Err(ConfigError::InstanceNotFound(id.to_string()));
        }
        self.session.teardown(id)
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        self.session.snapshot()
    }
}
