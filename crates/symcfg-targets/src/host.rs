//! Host bindings supplied when a configuration session starts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TargetError};
use crate::processor::{Clocks, Processor, Toolchain};

/// Initial bindings the host hands to every instance: the target
/// processor, the selected toolchain, clock frequencies and the
/// configuration name used in generated project paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostBindings {
    pub processor: Processor,
    pub toolchain: Toolchain,
    pub clocks: Clocks,
    pub configuration: String,
    /// Selected memory target, when the processor has any.
    pub memory: Option<String>,
}

impl HostBindings {
    /// Bind a processor with its defaults.
    pub fn new(processor: Processor) -> Result<Self> {
        let toolchain = processor.default_toolchain().ok_or_else(|| TargetError::NoToolchain {
            processor: processor.name.clone(),
        })?;
        Ok(Self {
            toolchain,
            clocks: processor.clocks,
            memory: processor.default_memory.clone(),
            processor,
            configuration: "default".into(),
        })
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Result<Self> {
        if !self.processor.supports(toolchain) {
            return Err(TargetError::UnsupportedToolchain {
                toolchain,
                processor: self.processor.name.clone(),
            });
        }
        self.toolchain = toolchain;
        Ok(self)
    }

    pub fn with_clocks(mut self, clocks: Clocks) -> Result<Self> {
        if clocks.processor_hz == 0 || clocks.master_hz == 0 {
            return Err(TargetError::InvalidClocks {
                processor_hz: clocks.processor_hz,
                master_hz: clocks.master_hz,
            });
        }
        self.clocks = clocks;
        Ok(self)
    }

    pub fn with_memory(mut self, memory: &str) -> Result<Self> {
        if self.processor.memory_target(memory).is_none() {
            return Err(TargetError::UnknownMemoryTarget {
                memory: memory.into(),
                processor: self.processor.name.clone(),
            });
        }
        self.memory = Some(memory.into());
        Ok(self)
    }

    pub fn with_configuration(mut self, name: impl Into<String>) -> Self {
        self.configuration = name.into();
        self
    }

    /// Project path of configuration-specific files: `config/<name>/`.
    pub fn config_path(&self, subdir: &str) -> String {
        let subdir = subdir.trim_matches('/');
        if subdir.is_empty() {
            format!("config/{}/", self.configuration)
        } else {
            format!("config/{}/{subdir}/", self.configuration)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_processor() {
        let host = HostBindings::new(Processor::atsama5d27()).unwrap();
        assert_eq!(host.toolchain, Toolchain::Xc32);
        assert_eq!(host.memory.as_deref(), Some("DDR"));
        assert_eq!(host.clocks.master_hz, 166_000_000);
        assert_eq!(host.config_path("peripheral/sdramc"), "config/default/peripheral/sdramc/");
        assert_eq!(host.config_path(""), "config/default/");
    }

    #[test]
    fn unsupported_toolchain_is_rejected() {
        let host = HostBindings::new(Processor::pic32mz2048efm100()).unwrap();
        let err = host.with_toolchain(Toolchain::Iar).unwrap_err();
        assert!(matches!(
            err,
            TargetError::UnsupportedToolchain { toolchain: Toolchain::Iar, .. }
        ));
    }

    #[test]
    fn memory_and_clocks_are_checked() {
        let host = HostBindings::new(Processor::atsama5d27()).unwrap();
        let err = host.clone().with_memory("FLASH").unwrap_err();
        assert_eq!(err.to_string(), "memory target 'FLASH' is not defined for ATSAMA5D27");
        assert_eq!(host.clone().with_memory("SRAM").unwrap().memory.as_deref(), Some("SRAM"));
        let zero = Clocks {
            processor_hz: 0,
            master_hz: 1,
        };
        assert!(matches!(host.with_clocks(zero), Err(TargetError::InvalidClocks { .. })));
    }

    #[test]
    fn processor_without_toolchains_cannot_be_bound() {
        let mut p = Processor::atsamc21n18a();
        p.toolchains.clear();
        assert!(matches!(HostBindings::new(p), Err(TargetError::NoToolchain { .. })));
    }
}
