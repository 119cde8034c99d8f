//! PIC32 enhanced vectored interrupt controller, declared in `core`.
//!
//! Peripheral components mirror the enable, priority, sub-priority and
//! handler of their vector from here; see [`vector_id`].

use symcfg_bitfield::indexed::{PRIORITY_MASK, SUBPRIORITY_MASK};
use symcfg_core::{ArtifactKind, ConfigError, InstanceBuilder, Result, SymbolSpec};

use crate::core_config::{CORE, LIST_SYSTEM_DEFINITIONS, LIST_SYSTEM_INIT_PERIPHERALS};
use crate::environment::{list_entry, Environment};

const TEMPLATES: &str = "../peripheral/evic_01166/templates";

/// Priority a newly enabled vector starts at; 0 would leave it masked.
pub const DEFAULT_PRIORITY: i64 = 1;

/// Id of a per-vector symbol in `core`, e.g. `core.EVIC_4_PRIORITY`.
pub fn vector_id(vector: u32, suffix: &str) -> String {
    format!("{CORE}.EVIC_{vector}_{suffix}")
}

pub(crate) fn declare(builder: &mut InstanceBuilder<'_>, env: &Environment<'_>) -> Result<()> {
    let menu = builder.symbol(SymbolSpec::menu("EVIC_MENU").label("Interrupts (EVIC)"))?;

    for interrupt in env.device.interrupts()? {
        let n = u32::try_from(interrupt.index).map_err(|_| ConfigError::MalformedMetadata {
            selector: format!("interrupt {}", interrupt.name),
            detail: format!("EVIC vector index {} is negative", interrupt.index),
        })?;
        let name = interrupt.header_name();
        let id = |suffix: &str| format!("EVIC_{n}_{suffix}");

        let enable = builder.symbol(
            SymbolSpec::boolean(&id("ENABLE"), false)
                .label(format!("Enable {} Interrupt", interrupt.header_caption()))
                .parent(menu),
        )?;
        builder.symbol(
            SymbolSpec::string(&id("VECTOR"), name)
                .label("Vector Name")
                .parent(enable)
                .locked(),
        )?;
        builder.symbol(
            SymbolSpec::integer(&id("PRIORITY"), DEFAULT_PRIORITY)
                .range(0, PRIORITY_MASK as i64)
                .label("Priority")
                .parent(enable),
        )?;
        builder.symbol(
            SymbolSpec::integer(&id("SUBPRIORITY"), 0)
                .range(0, SUBPRIORITY_MASK as i64)
                .label("Subpriority")
                .parent(enable),
        )?;
        builder.symbol(
            SymbolSpec::string(&id("HANDLER"), format!("{name}_Handler"))
                .label("Handler")
                .parent(enable),
        )?;
    }

    let file = |kind, template: &str, output: &str| {
        vec![env.peripheral_file(kind, TEMPLATES, template, output, "peripheral/evic")]
    };
    builder.slot("EVIC_HEADER", file(ArtifactKind::Header, "plib_evic.h.ftl", "plib_evic.h"))?;
    builder.slot("EVIC_SOURCE", file(ArtifactKind::Source, "plib_evic.c.ftl", "plib_evic.c"))?;
    builder.slot(
        "EVIC_SYS_INIT",
        vec![list_entry(
            format!("{TEMPLATES}/system/initialization.c.ftl"),
            LIST_SYSTEM_INIT_PERIPHERALS,
        )],
    )?;
    builder.slot(
        "EVIC_SYS_DEF",
        vec![list_entry(format!("{TEMPLATES}/system/definitions.h.ftl"), LIST_SYSTEM_DEFINITIONS)],
    )?;
    Ok(())
}
