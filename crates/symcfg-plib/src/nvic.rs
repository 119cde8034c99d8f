//! Cortex-M nested vectored interrupt controller, declared in `core`.
//!
//! One group of symbols per interrupt vector, seeded from a table of
//! per-exception settings. Fixed-priority exceptions keep their negative
//! priority and cannot be edited; everything else ranges over the
//! priority levels the device implements.

use symcfg_core::{ArtifactKind, ConfigError, InstanceBuilder, Result, SymbolRef, SymbolSpec};
use symcfg_device::ROOT_TAG;

use crate::core_config::{
    LIST_INTERRUPT_HANDLERS, LIST_INTERRUPT_WEAK_HANDLERS, LIST_SYSTEM_DEFINITIONS,
    LIST_SYSTEM_INIT_PERIPHERALS,
};
use crate::environment::{list_entry, Environment};

const TEMPLATES: &str = "../peripheral/nvic_m7/templates";
const PRIORITY_BITS: &str = "__NVIC_PRIO_BITS";

/// Initial settings of one vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSettings {
    pub enable: bool,
    pub enable_lock: bool,
    pub enable_generate: bool,
    /// Initial priority; negative for the fixed-priority exceptions.
    pub priority: i64,
    pub priority_lock: bool,
    pub priority_generate: bool,
    pub handler_lock: bool,
}

const fn settings(
    enable: bool,
    enable_lock: bool,
    enable_generate: bool,
    priority: i64,
    priority_lock: bool,
    priority_generate: bool,
    handler_lock: bool,
) -> VectorSettings {
    VectorSettings {
        enable,
        enable_lock,
        enable_generate,
        priority,
        priority_lock,
        priority_generate,
        handler_lock,
    }
}

const EXCEPTIONS: &[(&str, VectorSettings)] = &[
    ("Reset", settings(true, true, false, -3, true, false, true)),
    ("NonMaskableInt", settings(true, true, false, -2, true, false, true)),
    ("HardFault", settings(true, true, false, -1, true, false, true)),
    ("MemoryManagement", settings(false, true, false, 0, false, true, true)),
    ("BusFault", settings(false, false, false, 0, false, true, true)),
    ("UsageFault", settings(false, false, false, 0, false, true, true)),
    ("SVCall", settings(true, true, false, 0, false, true, true)),
    ("DebugMonitor", settings(false, false, false, 0, false, true, true)),
    ("PendSV", settings(true, true, false, 0, false, true, true)),
    ("SysTick", settings(false, true, false, 0, false, true, true)),
];

/// Settings for the vector named `name`; peripheral interrupts start
/// disabled at the lowest priority `levels`.
pub fn vector_settings(name: &str, levels: i64) -> VectorSettings {
    EXCEPTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, s)| *s)
        .unwrap_or(settings(false, false, true, levels, false, true, false))
}

/// Lowest priority value: `2^__NVIC_PRIO_BITS - 1`.
pub fn priority_levels(bits: u64) -> Result<i64> {
    if !(1..=8).contains(&bits) {
        return Err(ConfigError::MalformedMetadata {
            selector: parameter_selector(),
            detail: format!("{bits} priority bits is not between 1 and 8"),
        });
    }
    Ok((1i64 << bits) - 1)
}

fn parameter_selector() -> String {
    format!("/{ROOT_TAG}/devices/device/parameters/param@[name=\"{PRIORITY_BITS}\"]")
}

pub(crate) fn declare(
    builder: &mut InstanceBuilder<'_>,
    env: &Environment<'_>,
    parent: Option<SymbolRef>,
) -> Result<()> {
    let bits = env
        .device
        .parameter_value(PRIORITY_BITS)?
        .ok_or_else(|| ConfigError::MissingMetadataNode(parameter_selector()))?;
    let levels = priority_levels(bits)?;
    let interrupts = env.device.interrupts()?;

    let mut menu = SymbolSpec::menu("NVIC_MENU").label("Interrupts (NVIC)");
    if let Some(parent) = parent {
        menu = menu.parent(parent);
    }
    let menu = builder.symbol(menu)?;
    let highest = interrupts.iter().map(|i| i.index).max().unwrap_or(0);
    let lowest = interrupts.iter().map(|i| i.index).min().unwrap_or(0);
    for (name, value, label) in [
        ("NVIC_VECTOR_MAX", highest, "Vector Max Value"),
        ("NVIC_VECTOR_MIN", lowest, "Vector Min Value"),
    ] {
        builder.symbol(SymbolSpec::integer(name, value.into()).label(label).parent(menu).hidden())?;
    }

    for interrupt in &interrupts {
        let n = interrupt.index;
        let name = interrupt.header_name();
        let s = vector_settings(name, levels);
        let flag = |suffix: &str, value: bool, label: &str| {
            SymbolSpec::boolean(&format!("NVIC_{n}_{suffix}"), value).label(label).hidden()
        };

        let mut enable = SymbolSpec::boolean(&format!("NVIC_{n}_ENABLE"), s.enable)
            .label(format!("Enable {} Interrupt", interrupt.header_caption()))
            .parent(menu);
        if s.enable_lock {
            enable = enable.locked();
        }
        let enable = builder.symbol(enable)?;

        builder.symbol(
            SymbolSpec::integer(&format!("NVIC_{n}"), n.into())
                .label("Vector Number")
                .parent(enable)
                .locked(),
        )?;
        builder.symbol(
            SymbolSpec::string(&format!("NVIC_{n}_VECTOR"), name)
                .label("Vector Name")
                .parent(enable)
                .locked(),
        )?;
        builder.symbol(flag("ENABLE_LOCK", s.enable_lock, "Enable Lock").parent(enable))?;
        builder
            .symbol(flag("ENABLE_GENERATE", s.enable_generate, "Enable Generate").parent(enable))?;

        let mut priority = SymbolSpec::integer(&format!("NVIC_{n}_PRIORITY"), s.priority)
            .label("Priority")
            .parent(enable);
        priority = if s.priority < 0 {
            priority.range(s.priority, s.priority).locked()
        } else {
            priority.range(0, levels)
        };
        if s.priority_lock {
            priority = priority.locked();
        }
        builder.symbol(priority)?;
        builder.symbol(flag("PRIORITY_LOCK", s.priority_lock, "Priority Lock").parent(enable))?;
        builder.symbol(
            flag("PRIORITY_GENERATE", s.priority_generate, "Priority Generate").parent(enable),
        )?;

        let mut handler =
            SymbolSpec::string(&format!("NVIC_{n}_HANDLER"), format!("{name}_Handler"))
                .label("Handler")
                .parent(enable);
        if s.handler_lock {
            handler = handler.locked();
        }
        builder.symbol(handler)?;
        builder.symbol(flag("HANDLER_LOCK", s.handler_lock, "Handler Lock").parent(enable))?;
    }

    let file = |kind, template: &str, output: &str| {
        env.peripheral_file(kind, TEMPLATES, template, output, "peripheral/nvic")
    };
    let header = file(ArtifactKind::Header, "plib_nvic.h.ftl", "plib_nvic.h");
    builder.slot("NVIC_HEADER", vec![header])?;
    let source = file(ArtifactKind::Source, "plib_nvic.c.ftl", "plib_nvic.c");
    builder.slot("NVIC_SOURCE", vec![source])?;
    let system = |template: &str, list: &str| {
        vec![list_entry(format!("{TEMPLATES}/system/{template}"), list)]
    };
    builder.slot("NVIC_INIT", system("system_initialize.c.ftl", LIST_SYSTEM_INIT_PERIPHERALS))?;
    builder.slot("NVIC_DEF", system("system_definitions.h.ftl", LIST_SYSTEM_DEFINITIONS))?;
    builder.slot(
        "NVIC_INT_HANDLER",
        system("system_interrupt_weak_handlers.h.ftl", LIST_INTERRUPT_WEAK_HANDLERS),
    )?;
    builder.slot(
        "NVIC_INT_TABLE",
        system("system_interrupt_vector_table.h.ftl", LIST_INTERRUPT_HANDLERS),
    )?;
    Ok(())
}
