//! The shared `core` instance.
//!
//! Holds what every peripheral reads: device identity, compiler choice,
//! clock frequencies, the execution memory and the peripheral clock
//! enables. It owns the startup, linker and fault handler outputs, the
//! toolchain's compiler options and the string lists other components
//! append to, and declares the processor's interrupt controller in its own
//! namespace.

use symcfg_core::{
    ArtifactDescriptor, ArtifactKind, Condition, ConfigError, EnumOption, InstanceBuilder, Result,
    SymbolRef, SymbolSpec, Value,
};
use symcfg_targets::{InterruptController, Processor};

use crate::component::Component;
use crate::environment::Environment;
use crate::{evic, nvic};

pub const CORE: &str = "core";

pub const LIST_SYSTEM_INIT_PERIPHERALS: &str = "LIST_SYSTEM_INIT_C_SYS_INITIALIZE_PERIPHERALS";
pub const LIST_SYSTEM_INIT_CORE: &str = "LIST_SYSTEM_INIT_C_SYS_INITIALIZE_CORE";
pub const LIST_SYSTEM_DEFINITIONS: &str = "LIST_SYSTEM_DEFINITIONS_H_INCLUDES";
pub const LIST_INTERRUPT_WEAK_HANDLERS: &str = "LIST_SYSTEM_INTERRUPT_WEAK_HANDLERS";
pub const LIST_INTERRUPT_HANDLERS: &str = "LIST_SYSTEM_INTERRUPT_HANDLERS";

const LISTS: [&str; 5] = [
    LIST_SYSTEM_INIT_PERIPHERALS,
    LIST_SYSTEM_INIT_CORE,
    LIST_SYSTEM_DEFINITIONS,
    LIST_INTERRUPT_WEAK_HANDLERS,
    LIST_INTERRUPT_HANDLERS,
];

/// Id of the peripheral clock enable of a module: `core.PMC_ID_<MODULE>`.
pub fn clock_enable_id(module: &str) -> String {
    format!("{CORE}.PMC_ID_{module}")
}

/// The `core` component.
pub struct CoreComponent;

impl Component for CoreComponent {
    fn name(&self) -> &'static str {
        CORE
    }

    fn instance_id(&self, _index: u32) -> String {
        CORE.to_string()
    }

    fn declare(&self, builder: &mut InstanceBuilder<'_>, env: &Environment<'_>) -> Result<()> {
        let host = env.host;
        let processor = &host.processor;
        let arch = processor.architecture;

        builder.symbol(
            SymbolSpec::string("DEVICE_FAMILY", processor.family.as_str())
                .label("Device Family")
                .hidden()
                .locked(),
        )?;
        builder.symbol(
            SymbolSpec::string("DEVICE_NAME", processor.name.as_str())
                .hidden()
                .locked(),
        )?;
        builder.symbol(SymbolSpec::string("ARCHITECTURE", arch.device_name()).hidden().locked())?;

        let menu = if arch.is_arm() {
            let label = format!("{arch} Configuration");
            Some(builder.symbol(SymbolSpec::menu("CORTEX_MENU").label(label))?)
        } else {
            None
        };
        let under_menu = |spec: SymbolSpec| match menu {
            Some(m) => spec.parent(m),
            None => spec,
        };

        let toolchains: Vec<EnumOption> = processor
            .toolchains
            .iter()
            .enumerate()
            .map(|(i, tc)| EnumOption::new(tc.key(), i as u64, tc.to_string()))
            .collect();
        let compiler = builder.symbol(under_menu(
            SymbolSpec::enum_key("COMPILER_CHOICE", toolchains, host.toolchain.key())
                .label("Compiler"),
        ))?;

        let processor_hz = frequency(host.clocks.processor_hz, "processor")?;
        builder.symbol(
            SymbolSpec::integer("PROCESSORCLK_FREQ", processor_hz)
                .range(1, i64::MAX)
                .label("Processor Clock Frequency (Hz)"),
        )?;
        builder.symbol(
            SymbolSpec::integer("MASTERCLK_FREQ", frequency(host.clocks.master_hz, "master")?)
                .range(1, i64::MAX)
                .label("Master Clock Frequency (Hz)"),
        )?;

        let memory = declare_execution_memory(builder, env, menu)?;

        if arch.interrupt_controller() == InterruptController::Aic {
            builder.symbol(SymbolSpec::boolean("USE_FREERTOS_VECTORS", false).hidden().locked())?;
        }

        for list in LISTS {
            builder.symbol(SymbolSpec::menu(list).hidden())?;
        }

        if arch.is_arm() {
            for module in env.device.modules()? {
                let name = module.name();
                builder.symbol(
                    SymbolSpec::boolean(&format!("PMC_ID_{name}"), false)
                        .label(format!("{name} Peripheral Clock Enable")),
                )?;
            }
        }

        declare_outputs(builder, env, compiler, memory)?;

        match arch.interrupt_controller() {
            InterruptController::Nvic => nvic::declare(builder, env, menu),
            InterruptController::Evic => evic::declare(builder, env),
            InterruptController::Aic => Ok(()),
        }
    }
}

/// `EXECUTION_MEMORY` and the `APP_START_ADDRESS` it drives, for
/// processors that can run from more than one memory.
fn declare_execution_memory(
    builder: &mut InstanceBuilder<'_>,
    env: &Environment<'_>,
    menu: Option<SymbolRef>,
) -> Result<Option<SymbolRef>> {
    let processor = &env.host.processor;
    if processor.memory_targets.is_empty() {
        return Ok(None);
    }
    let selected = match env.host.memory.as_deref().and_then(|m| processor.memory_target(m)) {
        Some(target) => target,
        None => return Err(undefined(processor, "the selected memory target")),
    };

    let options = processor
        .memory_targets
        .iter()
        .enumerate()
        .map(|(i, m)| EnumOption::new(m.name.as_str(), i as u64, format!("Run from {}", m.name)))
        .collect();
    let mut spec = SymbolSpec::enum_key("EXECUTION_MEMORY", options, selected.name.as_str())
        .label("Execution Memory");
    if let Some(menu) = menu {
        spec = spec.parent(menu);
    }
    let memory = builder.symbol(spec)?;
    let start = builder
        .symbol(SymbolSpec::string("APP_START_ADDRESS", selected.app_start_literal()).hidden())?;

    let addresses: Vec<(String, String)> = processor
        .memory_targets
        .iter()
        .map(|m| (m.name.clone(), m.app_start_literal()))
        .collect();
    builder.rule(start, &[memory], move |ctx, _| {
        let key = ctx.key(memory)?;
        match addresses.iter().find(|(name, _)| name == key) {
            Some((_, address)) => Ok(Value::string(address.as_str()).into()),
            None => Err(ctx.fail(format!("no memory target named {key}"))),
        }
    })?;
    Ok(Some(memory))
}

/// Startup file, linker script and fault handlers.
fn declare_outputs(
    builder: &mut InstanceBuilder<'_>,
    env: &Environment<'_>,
    compiler: SymbolRef,
    memory: Option<SymbolRef>,
) -> Result<()> {
    let processor = &env.host.processor;
    let project = env.host.config_path("");

    let startup = processor
        .startup
        .iter()
        .filter(|s| processor.supports(s.toolchain))
        .map(|s| {
            ArtifactDescriptor::new(ArtifactKind::Source, s.template.as_str(), s.output.as_str())
                .with_location("", project.as_str())
                .when_equals(compiler, Value::key(s.toolchain.key()))
        })
        .collect();
    builder.slot("STARTUP_C", startup)?;

    let mut linker = Vec::new();
    for script in processor.linker.iter().filter(|l| processor.supports(l.toolchain)) {
        let mut descriptor = ArtifactDescriptor::new(
            ArtifactKind::Linker,
            script.template.as_str(),
            script.output.as_str(),
        )
        .with_location("", project.as_str())
        .when_equals(compiler, Value::key(script.toolchain.key()));
        if let Some(target) = &script.memory {
            let memory =
                memory.ok_or_else(|| undefined(processor, &format!("memory target {target}")))?;
            descriptor = descriptor.when_equals(memory, Value::key(target.as_str()));
        }
        linker.push(descriptor);
    }
    builder.slot("LINKER_SCRIPT", linker)?;

    // One slot per compiler option; other toolchains select "no output".
    for (i, setting) in processor.settings.iter().enumerate() {
        if !processor.supports(setting.toolchain) {
            continue;
        }
        let others = processor
            .toolchains
            .iter()
            .filter(|tc| **tc != setting.toolchain)
            .map(|tc| Value::key(tc.key()))
            .collect();
        builder.slot(
            &format!("COMPILER_SETTING_{i}"),
            vec![
                ArtifactDescriptor::setting(
                    setting.category.as_str(),
                    setting.key.as_str(),
                    setting.value.as_str(),
                )
                .when_equals(compiler, Value::key(setting.toolchain.key())),
                ArtifactDescriptor::disabled().when(Condition::one_of(compiler, others)),
            ],
        )?;
    }

    if let Some(template) = processor.fault_handler_template() {
        builder.slot(
            "DFLT_FAULT_HANDLER_C",
            vec![ArtifactDescriptor::new(ArtifactKind::Source, template, "fault_handlers.c")
                .with_location("", project.as_str())],
        )?;
    }
    Ok(())
}

fn frequency(hz: u64, clock: &str) -> Result<i64> {
    i64::try_from(hz).map_err(|_| ConfigError::MalformedMetadata {
        selector: format!("clocks.{clock}"),
        detail: format!("{hz} Hz is out of range"),
    })
}

fn undefined(processor: &Processor, what: &str) -> ConfigError {
    ConfigError::MalformedMetadata {
        selector: format!("processor {}", processor.name),
        detail: format!("{what} is not defined"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symcfg_core::Session;
    use symcfg_device::{DeviceTree, Node, ROOT_TAG};
    use symcfg_targets::{HostBindings, Toolchain};

    fn empty_device() -> DeviceTree {
        DeviceTree::new(Node::new(ROOT_TAG))
    }

    fn core_session(host: &HostBindings) -> Session {
        let device = empty_device();
        let env = Environment::new(&device, host);
        let mut session = Session::new();
        let mut builder = session.instantiate(CORE, 0).unwrap();
        CoreComponent.declare(&mut builder, &env).unwrap();
        builder.finish().unwrap();
        session
    }

    #[test]
    fn execution_memory_drives_start_address() {
        let host = HostBindings::new(Processor::atsama5d27()).unwrap();
        let mut session = core_session(&host);
        assert_eq!(session.value("core.APP_START_ADDRESS").unwrap(), &Value::string("0x26f00000"));
        assert_eq!(session.active_artifact("core.LINKER_SCRIPT").unwrap().output_name, "ddr.ld");

        session.set("core.EXECUTION_MEMORY", Value::key("SRAM")).unwrap();
        assert_eq!(session.value("core.APP_START_ADDRESS").unwrap(), &Value::string("0x0"));
        assert_eq!(session.active_artifact("core.LINKER_SCRIPT").unwrap().output_name, "sram.ld");

        session.set("core.COMPILER_CHOICE", Value::key("IAR")).unwrap();
        assert_eq!(session.active_artifact("core.LINKER_SCRIPT").unwrap().output_name, "sram.icf");
        assert_eq!(session.active_artifact("core.STARTUP_C").unwrap().output_name, "cstartup.s");
    }

    #[test]
    fn bound_memory_and_toolchain_seed_the_defaults() {
        let host = HostBindings::new(Processor::atsama5d27())
            .unwrap()
            .with_memory("SRAM")
            .unwrap()
            .with_toolchain(Toolchain::Iar)
            .unwrap();
        let session = core_session(&host);
        assert_eq!(session.value("core.APP_START_ADDRESS").unwrap(), &Value::string("0x0"));
        assert_eq!(session.active_artifact("core.LINKER_SCRIPT").unwrap().output_name, "sram.icf");
    }

    #[test]
    fn fixed_image_processors_have_no_execution_memory() {
        let host = HostBindings::new(Processor::pic32mz2048efm100()).unwrap();
        let session = core_session(&host);
        assert!(session.lookup("core.EXECUTION_MEMORY").is_err());
        assert!(session.lookup("core.CORTEX_MENU").is_err());
        assert!(session.active_artifact("core.DFLT_FAULT_HANDLER_C").is_err());
        assert_eq!(session.value("core.MASTERCLK_FREQ").unwrap(), &Value::Int(100_000_000));
    }

    #[test]
    fn cortex_a5_menu_and_fault_handlers() {
        let host = HostBindings::new(Processor::atsama5d27())
            .unwrap()
            .with_configuration("sam_a5d2_xult");
        let session = core_session(&host);
        let menu = session.symbol(session.lookup("core.CORTEX_MENU").unwrap()).unwrap();
        assert_eq!(menu.label(), "Cortex-A5 Configuration");
        let handlers = session.active_artifact("core.DFLT_FAULT_HANDLER_C").unwrap();
        assert_eq!(handlers.project_path, "config/sam_a5d2_xult/");
        assert!(session.lookup("core.LIST_SYSTEM_DEFINITIONS_H_INCLUDES").is_ok());
    }

    #[test]
    fn cortex_a5_compiler_options_follow_the_toolchain() {
        let host = HostBindings::new(Processor::atsama5d27()).unwrap();
        let mut session = core_session(&host);
        let macros = session.active_artifact("core.COMPILER_SETTING_0").unwrap();
        assert_eq!(macros.kind, ArtifactKind::Setting);
        assert_eq!(macros.destination, "C32");
        assert_eq!(macros.output_name, "preprocessor-macros");
        assert_eq!(macros.template, "__FPU_PRESENT=1");
        let options = session.active_artifact("core.COMPILER_SETTING_1").unwrap();
        assert_eq!(options.template, "-marm -mcpu=cortex-a5 -mfpu=neon-vfpv4");

        let report = session.set("core.COMPILER_CHOICE", Value::key("IAR")).unwrap();
        assert!(report.switches.iter().any(|s| s.slot == "core.COMPILER_SETTING_0"));
        assert!(session.active_artifact("core.COMPILER_SETTING_0").unwrap().is_disabled());
        assert!(session.active_artifact("core.COMPILER_SETTING_1").unwrap().is_disabled());
    }

    #[test]
    fn freertos_vectors_only_on_cortex_a() {
        let host = HostBindings::new(Processor::atsama5d27()).unwrap();
        let mut session = core_session(&host);
        assert_eq!(session.value("core.USE_FREERTOS_VECTORS").unwrap(), &Value::Bool(false));
        let err = session.set("core.USE_FREERTOS_VECTORS", Value::Bool(true)).unwrap_err();
        assert!(matches!(err, ConfigError::SymbolLocked(_)));

        let host = HostBindings::new(Processor::atsame70q21b()).unwrap();
        let session = core_session(&host);
        assert!(session.lookup("core.USE_FREERTOS_VECTORS").is_err());
        assert!(session.artifacts().get_by_id("core.COMPILER_SETTING_0").is_none());
    }

    #[test]
    fn device_family_is_read_only() {
        let host = HostBindings::new(Processor::pic32mz2048efm100()).unwrap();
        let mut session = core_session(&host);
        let err = session.set("core.DEVICE_FAMILY", Value::string("PIC32MK")).unwrap_err();
        assert!(matches!(err, ConfigError::SymbolLocked(_)));
        assert_eq!(clock_enable_id("SDRAMC"), "core.PMC_ID_SDRAMC");
    }
}
