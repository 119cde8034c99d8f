//! PIC32 Type A timer 1.
//!
//! The control register value is composed from the caption-keyed T1CON
//! selections. Interrupt priority, sub-priority, handler and enable are
//! mirrored from the EVIC symbols of the timer's vector in `core`.

use symcfg_bitfield::{indexed_register_location, priority_location, KeySource, RegisterLayout};
use symcfg_core::{
    ArtifactDescriptor, ArtifactKind, ConfigError, Effect, InstanceBuilder, Result, SymbolRef,
    SymbolSpec, Value,
};

use crate::component::{option_key, register_value, Component};
use crate::core_config::{
    LIST_INTERRUPT_HANDLERS, LIST_SYSTEM_DEFINITIONS, LIST_SYSTEM_INIT_PERIPHERALS,
};
use crate::environment::{list_entry, Environment};
use crate::evic::vector_id;

const MODULE: &str = "TMR1";
const INSTANCE_NUM: u32 = 1;
const DEFAULT_PRESCALER: &str = "1:256 prescale value";
const DEFAULT_PERIOD: i64 = 64000;

/// Divider named by a prescaler caption: `"1:64 prescale value"` is 64.
pub fn prescaler_value(caption: &str) -> Option<i64> {
    let (_, ratio) = caption.split_once(':')?;
    ratio.split_whitespace().next()?.parse().ok().filter(|n| *n >= 1)
}

/// Timer 1 (`tmr1`). There is one per device, so the instance id carries
/// no index.
pub struct Tmr1;

impl Component for Tmr1 {
    fn name(&self) -> &'static str {
        "tmr1"
    }

    fn module(&self) -> Option<&'static str> {
        Some(MODULE)
    }

    fn instance_id(&self, _index: u32) -> String {
        self.name().to_string()
    }

    fn declare(&self, builder: &mut InstanceBuilder<'_>, env: &Environment<'_>) -> Result<()> {
        let device = env.device;
        let module_id = device.module_id(MODULE)?.to_string();
        let interrupt = device.interrupt_for(&format!("TIMER_{INSTANCE_NUM}"))?;
        let vector = u32::try_from(interrupt.index).map_err(|_| ConfigError::MalformedMetadata {
            selector: format!("interrupt {}", interrupt.name),
            detail: format!("EVIC vector index {} is negative", interrupt.index),
        })?;

        builder.symbol(SymbolSpec::string("TMR1_INSTANCE_NAME", MODULE).hidden())?;
        builder.symbol(SymbolSpec::integer("TMR1_INSTANCE_NUM", INSTANCE_NUM.into()).hidden())?;

        // Interrupt registers
        let flag = indexed_register_location(vector, 32)?;
        let priority = priority_location(vector);
        builder.symbol(SymbolSpec::string("TMR1_IEC_REG", flag.register_name("IEC")).hidden())?;
        builder.symbol(SymbolSpec::string("TMR1_IFS_REG", flag.register_name("IFS")).hidden())?;
        builder.symbol(SymbolSpec::hex("TMR1_IRQ_MASK", flag.bit_mask).hidden())?;
        builder.symbol(SymbolSpec::string("TMR1_IPC_REG", priority.register_name("IPC")).hidden())?;

        let core_priority = builder.lookup(&vector_id(vector, "PRIORITY"))?;
        let core_subpriority = builder.lookup(&vector_id(vector, "SUBPRIORITY"))?;
        let core_handler = builder.lookup(&vector_id(vector, "HANDLER"))?;
        let core_enable = builder.lookup(&vector_id(vector, "ENABLE"))?;

        let mut mirror = |name: &str, upstream: SymbolRef| -> Result<SymbolRef> {
            let symbol = builder.symbol(SymbolSpec::hex(name, 0).hidden())?;
            builder.rule(symbol, &[upstream], move |ctx, _| {
                Ok(Value::Hex(register_value(ctx, upstream)?).into())
            })?;
            Ok(symbol)
        };
        let pri = mirror("TMR1_IPC_PRI_VALUE", core_priority)?;
        let subpri = mirror("TMR1_IPC_SUBPRI_VALUE", core_subpriority)?;
        let ipc = builder.symbol(SymbolSpec::hex("TMR1_IPC_VALUE", 0).width(32).hidden())?;
        builder.rule(ipc, &[pri, subpri], move |ctx, _| {
            Ok(Value::Hex(priority.compose(ctx.hex(pri)?, ctx.hex(subpri)?)).into())
        })?;

        let handler = builder.symbol(SymbolSpec::string("TMR1_ISR_HANDLER_NAME", "").hidden())?;
        builder.rule(handler, &[core_handler], move |ctx, _| {
            Ok(Value::string(ctx.string(core_handler)?).into())
        })?;

        // Control register
        let t1con = RegisterLayout::from_metadata(device, MODULE, "T1CON", KeySource::Caption)?;
        let selection = |name: &str, field: &str, default: usize| -> Result<SymbolSpec> {
            let bits = t1con.field(field)?;
            let key = option_key(&bits.options, default, field)?;
            Ok(SymbolSpec::enum_key(name, bits.options.clone(), key).label(bits.caption.as_str()))
        };
        let sidl = builder.symbol(selection("TIMER1_SIDL", "SIDL", 1)?)?;
        builder.symbol(selection("TIMER1_START", "ON", 1)?.hidden())?;
        let tsync = builder.symbol(selection("TIMER1_TSYNC_SEL", "TSYNC", 0)?)?;
        let tcs = builder.symbol(selection("TIMER1_SRC_SEL", "TCS", 1)?)?;
        let prescale = t1con.field("TCKPS")?;
        let tckps = builder.symbol(
            SymbolSpec::enum_key("TIMER1_PRE_SCALER", prescale.options.clone(), DEFAULT_PRESCALER)
                .label(prescale.caption.as_str())
                .hidden(),
        )?;

        let prescaler = builder.symbol(
            SymbolSpec::integer("TMR1_PRESCALER_VALUE", 256)
                .range(1, i64::MAX)
                .label("Prescaler Value")
                .hidden(),
        )?;
        builder.rule(prescaler, &[tckps], move |ctx, _| {
            let caption = ctx.key(tckps)?;
            let value = prescaler_value(caption)
                .ok_or_else(|| ctx.fail(format!("no divider in prescaler option {caption:?}")))?;
            Ok(Value::Int(value).into())
        })?;

        let tcon = builder.symbol(SymbolSpec::hex("TCON_REG_VALUE", 0).width(32).hidden())?;
        let fields = [("SIDL", sidl), ("TCKPS", tckps), ("TSYNC", tsync), ("TCS", tcs)];
        let upstream: Vec<SymbolRef> = fields.iter().map(|(_, s)| *s).collect();
        builder.rule(tcon, &upstream, move |ctx, _| {
            let mut values = Vec::with_capacity(fields.len());
            for (field, symbol) in fields {
                values.push((field, ctx.selected_value(symbol)?));
            }
            let composed = t1con.compose(&values).map_err(|e| ctx.fail(e.to_string()))?;
            Ok(Value::Hex(composed).into())
        })?;

        let pr1 = RegisterLayout::from_metadata(device, MODULE, "PR1", KeySource::Caption)?;
        let period = pr1.field("PR1")?;
        let period_max = i64::try_from((1u64 << period.width.min(63)) - 1).unwrap_or(i64::MAX);
        builder.symbol(
            SymbolSpec::integer("TIMER1_PERIOD", DEFAULT_PERIOD)
                .range(0, period_max)
                .label(period.caption.as_str()),
        )?;

        // Interrupt status
        let enabled =
            builder.symbol(SymbolSpec::boolean("TMR1_INTERRUPT_ENABLE", false).hidden())?;
        builder.rule(enabled, &[core_enable], move |ctx, _| {
            Ok(Value::Bool(ctx.boolean(core_enable)?).into())
        })?;
        let warning = builder.symbol(
            SymbolSpec::menu("TMR1_INTR_ENABLE_COMMENT")
                .label(format!(
                    "Warning!!! TIMER{INSTANCE_NUM} Interrupt is Disabled in Interrupt Manager"
                ))
                .hidden(),
        )?;
        builder.rule(warning, &[core_enable], move |ctx, _| {
            Ok(Effect::Visible(!ctx.boolean(core_enable)?))
        })?;

        // Outputs
        let templates = format!("../peripheral/tmr1_{module_id}/templates");
        let instance = MODULE.to_ascii_lowercase();
        let file = |kind, template: &str, output: String| {
            env.peripheral_file(kind, &templates, template, &output, "peripheral/tmr1")
        };
        builder.slot(
            "TMR1_COMMON_HEADER",
            vec![file(ArtifactKind::Header, "plib_tmr1_common.h", "plib_tmr1_common.h".into())
                .with_markup(false)],
        )?;
        builder.slot(
            "TMR1_HEADER",
            vec![file(ArtifactKind::Header, "plib_tmr1.h.ftl", format!("plib_{instance}.h"))],
        )?;
        builder.slot(
            "TMR1_SOURCE",
            vec![file(ArtifactKind::Source, "plib_tmr1.c.ftl", format!("plib_{instance}.c"))],
        )?;
        builder.slot(
            "TMR1_SYS_INT",
            vec![list_entry(
                format!("{templates}/system/system_initialize.c.ftl"),
                LIST_SYSTEM_INIT_PERIPHERALS,
            )],
        )?;
        builder.slot(
            "TMR1_SYS_DEF",
            vec![list_entry(
                format!("{templates}/system/system_definitions.h.ftl"),
                LIST_SYSTEM_DEFINITIONS,
            )],
        )?;
        builder.slot(
            "TMR1_INT_HANDLER",
            vec![
                list_entry(
                    format!("{templates}/system/interrupt_handler.c.ftl"),
                    LIST_INTERRUPT_HANDLERS,
                )
                .when_equals(enabled, Value::Bool(true)),
                ArtifactDescriptor::disabled().when_equals(enabled, Value::Bool(false)),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prescaler_captions() {
        assert_eq!(prescaler_value("1:256 prescale value"), Some(256));
        assert_eq!(prescaler_value("1:8 prescale value"), Some(8));
        assert_eq!(prescaler_value("1:1"), Some(1));
        assert_eq!(prescaler_value("1:0 prescale value"), None);
        assert_eq!(prescaler_value("no prescaler"), None);
    }
}
