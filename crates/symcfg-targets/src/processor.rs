//! Processor model.
//!
//! A processor definition names the device, its CPU architecture, the
//! toolchains that can build for it, the memory targets an image may run
//! from, its default clocks, the startup and linker templates generated
//! for each toolchain and memory target, and the compiler options a
//! toolchain needs for the core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// CPU architecture of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    CortexA5,
    CortexM7,
    #[serde(rename = "cortex-m0plus")]
    CortexM0Plus,
    Mips32,
}

/// Interrupt controller family used by an architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptController {
    /// Cortex-M nested vectored interrupt controller.
    Nvic,
    /// PIC32 enhanced vectored interrupt controller.
    Evic,
    /// Cortex-A advanced interrupt controller, configured outside the core.
    Aic,
}

impl Architecture {
    pub fn interrupt_controller(self) -> InterruptController {
        match self {
            Architecture::CortexM7 | Architecture::CortexM0Plus => InterruptController::Nvic,
            Architecture::Mips32 => InterruptController::Evic,
            Architecture::CortexA5 => InterruptController::Aic,
        }
    }

    pub fn is_arm(self) -> bool {
        !matches!(self, Architecture::Mips32)
    }

    /// Architecture string used in device descriptions.
    pub fn device_name(self) -> &'static str {
        match self {
            Architecture::CortexA5 => "CORTEX-A5",
            Architecture::CortexM7 => "CORTEX-M7",
            Architecture::CortexM0Plus => "CORTEX-M0PLUS",
            Architecture::Mips32 => "MIPS",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::CortexA5 => "Cortex-A5",
            Architecture::CortexM7 => "Cortex-M7",
            Architecture::CortexM0Plus => "Cortex-M0+",
            Architecture::Mips32 => "MIPS32",
        };
        f.write_str(name)
    }
}

/// A C toolchain the generated project can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Toolchain {
    Xc32,
    Iar,
}

impl Toolchain {
    pub const ALL: [Toolchain; 2] = [Toolchain::Xc32, Toolchain::Iar];

    /// Key used for the compiler-choice symbol.
    pub fn key(self) -> &'static str {
        match self {
            Toolchain::Xc32 => "XC32",
            Toolchain::Iar => "IAR",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A memory an application image can be linked to run from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemoryTarget {
    /// Target name (e.g., "DDR", "SRAM").
    pub name: String,
    pub base_address: u64,
    pub size_bytes: u64,
    /// Address the application image starts at.
    pub app_start_address: u64,
}

impl MemoryTarget {
    pub fn new(
        name: impl Into<String>,
        base_address: u64,
        size_bytes: u64,
        app_start_address: u64,
    ) -> Self {
        Self {
            name: name.into(),
            base_address,
            size_bytes,
            app_start_address,
        }
    }

    pub fn end_address(&self) -> u64 {
        self.base_address.saturating_add(self.size_bytes)
    }

    /// Start address as a lowercase hex literal (`0x26f00000`).
    pub fn app_start_literal(&self) -> String {
        format!("{:#x}", self.app_start_address)
    }
}

/// Default clock frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Clocks {
    pub processor_hz: u64,
    /// Master (peripheral bus) clock.
    pub master_hz: u64,
}

/// A template rendered to one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StartupFile {
    pub toolchain: Toolchain,
    pub template: String,
    pub output: String,
}

/// A linker script template for one toolchain and, when the processor has
/// memory targets, one memory target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkerScript {
    pub toolchain: Toolchain,
    #[serde(default)]
    pub memory: Option<String>,
    pub template: String,
    pub output: String,
}

/// A compiler option appended to the generated project when `toolchain`
/// builds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompilerSetting {
    pub toolchain: Toolchain,
    /// Option category of the project file (e.g., "C32").
    pub category: String,
    pub key: String,
    pub value: String,
}

/// A complete processor definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Processor {
    /// Device name (e.g., "ATSAMA5D27").
    pub name: String,
    /// Device family (e.g., "SAMA5D2").
    pub family: String,
    pub architecture: Architecture,
    /// Supported toolchains; the first is the default.
    pub toolchains: Vec<Toolchain>,
    pub clocks: Clocks,
    /// Memory targets; empty when the image location is fixed.
    #[serde(default)]
    pub memory_targets: Vec<MemoryTarget>,
    #[serde(default)]
    pub default_memory: Option<String>,
    pub startup: Vec<StartupFile>,
    pub linker: Vec<LinkerScript>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<CompilerSetting>,
}

impl Processor {
    pub fn default_toolchain(&self) -> Option<Toolchain> {
        self.toolchains.first().copied()
    }

    pub fn supports(&self, toolchain: Toolchain) -> bool {
        self.toolchains.contains(&toolchain)
    }

    /// Look up a memory target by name.
    pub fn memory_target(&self, name: &str) -> Option<&MemoryTarget> {
        self.memory_targets.iter().find(|m| m.name == name)
    }

    pub fn startup_file(&self, toolchain: Toolchain) -> Option<&StartupFile> {
        self.startup.iter().find(|s| s.toolchain == toolchain)
    }

    /// Compiler options for one toolchain, in declaration order.
    pub fn settings_for(&self, toolchain: Toolchain) -> impl Iterator<Item = &CompilerSetting> {
        self.settings.iter().filter(move |s| s.toolchain == toolchain)
    }

    pub fn linker_script(
        &self,
        toolchain: Toolchain,
        memory: Option<&str>,
    ) -> Option<&LinkerScript> {
        self.linker
            .iter()
            .find(|l| l.toolchain == toolchain && l.memory.as_deref() == memory)
    }

    /// Default fault handler source, for architectures that generate one.
    pub fn fault_handler_template(&self) -> Option<&'static str> {
        match self.architecture {
            Architecture::CortexA5 => Some("arm/templates/common/mpu_handlers/fault_handlers.c"),
            Architecture::CortexM7 | Architecture::CortexM0Plus => {
                Some("arm/templates/common/fault_handlers/fault_handlers.c.ftl")
            }
            Architecture::Mips32 => None,
        }
    }

    /// SAMA5D27: Cortex-A5 running from DDR or internal SRAM.
    pub fn atsama5d27() -> Self {
        use Toolchain::{Iar, Xc32};
        let dir = |tc: &str| format!("arm/templates/{tc}/cortex_a/SAMA5D2");
        Self {
            name: "ATSAMA5D27".into(),
            family: "SAMA5D2".into(),
            architecture: Architecture::CortexA5,
            toolchains: vec![Xc32, Iar],
            clocks: Clocks {
                processor_hz: 498_000_000,
                master_hz: 166_000_000,
            },
            memory_targets: vec![
                MemoryTarget::new("DDR", 0x2000_0000, 0x1000_0000, 0x26f0_0000),
                MemoryTarget::new("SRAM", 0x0, 0x2_0000, 0x0),
            ],
            default_memory: Some("DDR".into()),
            startup: vec![
                StartupFile {
                    toolchain: Xc32,
                    template: format!("{}/cstartup.s.ftl", dir("xc32")),
                    output: "cstartup.S".into(),
                },
                StartupFile {
                    toolchain: Iar,
                    template: format!("{}/sam_a5_cstartup.s.ftl", dir("iar")),
                    output: "cstartup.s".into(),
                },
            ],
            linker: vec![
                linker(Xc32, Some("DDR"), format!("{}/ddram.ld.ftl", dir("xc32")), "ddr.ld"),
                linker(Xc32, Some("SRAM"), format!("{}/sram.ld.ftl", dir("xc32")), "sram.ld"),
                linker(Iar, Some("DDR"), format!("{}/sam_a5_ddr.icf.ftl", dir("iar")), "ddr.icf"),
                linker(Iar, Some("SRAM"), format!("{}/sram.icf.ftl", dir("iar")), "sram.icf"),
            ],
            settings: vec![
                setting(Xc32, "C32", "preprocessor-macros", "__FPU_PRESENT=1"),
                setting(Xc32, "C32", "appendMe", "-marm -mcpu=cortex-a5 -mfpu=neon-vfpv4"),
            ],
        }
    }

    /// SAME70Q21B: Cortex-M7 with external SDRAM controller.
    pub fn atsame70q21b() -> Self {
        Self::cortex_m(
            "ATSAME70Q21B",
            "SAME70",
            Architecture::CortexM7,
            Clocks {
                processor_hz: 300_000_000,
                master_hz: 150_000_000,
            },
        )
    }

    /// SAMC21N18A: Cortex-M0+.
    pub fn atsamc21n18a() -> Self {
        Self::cortex_m(
            "ATSAMC21N18A",
            "SAMC21",
            Architecture::CortexM0Plus,
            Clocks {
                processor_hz: 48_000_000,
                master_hz: 48_000_000,
            },
        )
    }

    /// PIC32MZ2048EFM100: MIPS32 M-class, XC32 only.
    pub fn pic32mz2048efm100() -> Self {
        Self {
            name: "PIC32MZ2048EFM100".into(),
            family: "PIC32MZEF".into(),
            architecture: Architecture::Mips32,
            toolchains: vec![Toolchain::Xc32],
            clocks: Clocks {
                processor_hz: 200_000_000,
                master_hz: 100_000_000,
            },
            memory_targets: Vec::new(),
            default_memory: None,
            startup: vec![StartupFile {
                toolchain: Toolchain::Xc32,
                template: "mips/templates/xc32/startup.S.ftl".into(),
                output: "startup.S".into(),
            }],
            linker: vec![linker(
                Toolchain::Xc32,
                None,
                "mips/templates/xc32/p32MZ2048EFM100.ld.ftl".into(),
                "p32MZ2048EFM100.ld",
            )],
            settings: Vec::new(),
        }
    }

    fn cortex_m(name: &str, family: &str, architecture: Architecture, clocks: Clocks) -> Self {
        Self {
            name: name.into(),
            family: family.into(),
            architecture,
            toolchains: vec![Toolchain::Xc32, Toolchain::Iar],
            clocks,
            memory_targets: Vec::new(),
            default_memory: None,
            startup: vec![
                StartupFile {
                    toolchain: Toolchain::Xc32,
                    template: "arm/templates/xc32/cortex_m/startup_xc32.c.ftl".into(),
                    output: "startup_xc32.c".into(),
                },
                StartupFile {
                    toolchain: Toolchain::Iar,
                    template: "arm/templates/iar/cortex_m/startup_iar.c.ftl".into(),
                    output: "startup_iar.c".into(),
                },
            ],
            linker: vec![
                linker(
                    Toolchain::Xc32,
                    None,
                    format!("arm/templates/xc32/cortex_m/{family}/{name}.ld.ftl"),
                    &format!("{name}.ld"),
                ),
                linker(
                    Toolchain::Iar,
                    None,
                    format!("arm/templates/iar/cortex_m/{family}/{name}.icf.ftl"),
                    &format!("{name}.icf"),
                ),
            ],
            settings: Vec::new(),
        }
    }

    /// All built-in processors.
    pub fn builtins() -> Vec<Processor> {
        vec![
            Self::atsama5d27(),
            Self::atsame70q21b(),
            Self::atsamc21n18a(),
            Self::pic32mz2048efm100(),
        ]
    }

    /// Built-in processor by case-insensitive name.
    pub fn builtin(name: &str) -> Option<Processor> {
        Self::builtins()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

fn linker(
    toolchain: Toolchain,
    memory: Option<&str>,
    template: String,
    output: &str,
) -> LinkerScript {
    LinkerScript {
        toolchain,
        memory: memory.map(str::to_string),
        template,
        output: output.into(),
    }
}

fn setting(toolchain: Toolchain, category: &str, key: &str, value: &str) -> CompilerSetting {
    CompilerSetting {
        toolchain,
        category: category.into(),
        key: key.into(),
        value: value.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sama5d2_linker_matrix() {
        let p = Processor::atsama5d27();
        assert_eq!(p.default_toolchain(), Some(Toolchain::Xc32));
        assert_eq!(p.linker_script(Toolchain::Xc32, Some("DDR")).unwrap().output, "ddr.ld");
        assert_eq!(p.linker_script(Toolchain::Iar, Some("SRAM")).unwrap().output, "sram.icf");
        assert!(p.linker_script(Toolchain::Iar, None).is_none());
        assert_eq!(p.memory_target("DDR").unwrap().app_start_literal(), "0x26f00000");
        assert_eq!(p.memory_target("SRAM").unwrap().app_start_literal(), "0x0");
    }

    #[test]
    fn sama5d2_needs_fpu_options_under_xc32() {
        let p = Processor::atsama5d27();
        let xc32: Vec<_> = p.settings_for(Toolchain::Xc32).map(|s| s.key.as_str()).collect();
        assert_eq!(xc32, ["preprocessor-macros", "appendMe"]);
        assert_eq!(p.settings[0].value, "__FPU_PRESENT=1");
        assert_eq!(p.settings_for(Toolchain::Iar).count(), 0);
        assert!(Processor::atsame70q21b().settings.is_empty());
    }

    #[test]
    fn cortex_m_has_fixed_image_location() {
        let p = Processor::atsame70q21b();
        assert!(p.memory_targets.is_empty());
        assert_eq!(p.linker_script(Toolchain::Iar, None).unwrap().output, "ATSAME70Q21B.icf");
        assert_eq!(p.architecture.interrupt_controller(), InterruptController::Nvic);
    }

    #[test]
    fn pic32_is_xc32_only() {
        let p = Processor::pic32mz2048efm100();
        assert!(p.supports(Toolchain::Xc32));
        assert!(!p.supports(Toolchain::Iar));
        assert_eq!(p.architecture.interrupt_controller(), InterruptController::Evic);
        assert!(p.fault_handler_template().is_none());
    }

    #[test]
    fn builtin_lookup_ignores_case() {
        assert_eq!(Processor::builtin("atsama5d27").unwrap().family, "SAMA5D2");
        assert!(Processor::builtin("stm32f407").is_none());
        assert_eq!(Processor::builtins().len(), 4);
    }

    #[test]
    fn toolchain_keys() {
        assert_eq!(Toolchain::from_key("iar"), Some(Toolchain::Iar));
        assert_eq!(Toolchain::Xc32.to_string(), "XC32");
        assert_eq!(Toolchain::from_key("gcc"), None);
    }
}
