//! SDRAM controller.
//!
//! Memory geometry selections come from the device's value groups; the
//! refresh count, the mode and extended mode register values and the
//! composed configuration register are kept in step by rules.

use log::debug;
use symcfg_bitfield::{derive_enum_options, KeySource, RegisterLayout};
use symcfg_core::{
    ArtifactKind, Domain, Effect, EnumOption, InstanceBuilder, Result, SymbolRef, SymbolSpec, Value,
};

use crate::component::{register_value, Component};
use crate::core_config::{LIST_SYSTEM_DEFINITIONS, LIST_SYSTEM_INIT_CORE};
use crate::environment::{list_entry, Environment};

const MODULE: &str = "SDRAMC";

const DEFAULT_REFRESH_MS: i64 = 32;

/// Refresh timer count for `time_ms` spread over every row.
///
/// `row_key` names the row address width in its last two characters
/// (`ROW11` is 2^11 rows). The clock is divided by the row count first,
/// truncating, and the product with the refresh time is then truncated
/// to milliseconds.
pub fn refresh_count(time_ms: i64, row_key: &str, clock_hz: i64) -> Option<i64> {
    let bits: u32 = row_key.get(row_key.len().checked_sub(2)?..)?.parse().ok()?;
    let rows = 1i64.checked_shl(bits).filter(|r| *r > 0)?;
    (clock_hz / rows).checked_mul(time_ms).map(|n| n / 1000)
}

/// Mode register value sent during initialization.
pub fn mode_register(interleaved: bool, cas_latency: u64, burst_length: u64) -> u64 {
    let burst_type = if interleaved { 8 } else { 0 };
    burst_type + 16 * cas_latency + burst_length
}

/// Extended mode register value for low-power SDRAM.
pub fn extended_mode_register(pasr: u64, tcsr: u64, drive_strength: u64) -> u64 {
    pasr + 8 * tcsr + 32 * drive_strength
}

/// The SDRAMC component (`sdramc0`, ...).
pub struct Sdramc;

impl Component for Sdramc {
    fn name(&self) -> &'static str {
        "sdramc"
    }

    fn module(&self) -> Option<&'static str> {
        Some(MODULE)
    }

    fn declare(&self, builder: &mut InstanceBuilder<'_>, env: &Environment<'_>) -> Result<()> {
        let device = env.device;
        let module_id = device.module_id(MODULE)?.to_string();
        let index = builder.index();

        builder.symbol(SymbolSpec::integer("INDEX", index.into()).hidden())?;
        let cpu_clock = builder.lookup("core.PROCESSORCLK_FREQ")?;
        let seed = builder.value(cpu_clock)?.clone();
        let cpu = builder.symbol(
            SymbolSpec::integer("SDRAMC_CPU_CLK_FREQ", seed.as_int().unwrap_or_default())
                .label("Get Core Clock Frequency")
                .hidden(),
        )?;
        builder.rule(cpu, &[cpu_clock], move |ctx, _| {
            Ok(Value::Int(ctx.integer(cpu_clock)?).into())
        })?;

        // Features
        let features = builder
            .symbol(SymbolSpec::menu("SDRAMC_FEATURE_MENU").label("Configure SDRAM features"))?;
        let mut selection = |name: &str, group: &str, label: &str, default: &str| -> Result<_> {
            let options = derive_enum_options(device.value_group(MODULE, group)?, KeySource::Name)?;
            builder.symbol(
                SymbolSpec::enum_key(name, options, default)
                    .label(label)
                    .parent(features),
            )
        };
        let md = selection("SDRAMC_MDR_MD", "SDRAMC_MDR__MD", "SDRAM Type", "SDRAM")?;
        let nr = selection("SDRAMC_CR__NR", "SDRAMC_CR__NR", "Number of Row Bits", "ROW11")?;
        let nc = selection("SDRAMC_CR__NC", "SDRAMC_CR__NC", "Number of Column Bits", "COL8")?;
        let nb = selection("SDRAMC_CR__NB", "SDRAMC_CR__NB", "Number of Banks", "BANK2")?;
        let bus_widths = vec![
            EnumOption::new("16-bits", 1, "16-bit data bus"),
            EnumOption::new("32-bits", 0, "32-bit data bus"),
        ];
        let dbw = builder.symbol(
            SymbolSpec::enum_key("SDRAMC_CR_DBW", bus_widths, "16-bits")
                .label("Data Bus Width")
                .parent(features)
                .locked(),
        )?;

        // Timing
        let timing = builder.symbol(
            SymbolSpec::menu("SDRAMC_TIMING_MENU").label("Configure SDRAM Timing Parameters"),
        )?;
        let mut delay = |name: &str, default: i64, label: &str| {
            builder.symbol(
                SymbolSpec::integer(name, default)
                    .range(0, 15)
                    .label(label)
                    .parent(timing),
            )
        };
        let trcd = delay("SDRAMC_CR_TRCD", 3, "Row Active to Column Read/Write Delay (TRCD)")?;
        let tras = delay("SDRAMC_CR_TRAS", 6, "Row Active to Precharge Delay (TRAS)")?;
        let trp = delay("SDRAMC_CR_TRP", 3, "Row Precharge Delay (TRP)")?;
        let trc_trfc = delay("SDRAMC_CR_TRC_TRFC", 9, "Row Cycle/Row Refresh Delay (TRC_TRFC)")?;
        let twr = delay("SDRAMC_CR_TWR", 2, "Write Recovery Delay (TWR)")?;
        delay("SDRAMC_CFR1_TMRD", 2, "Mode Register Set to Command Delay Time (TMRD)")?;
        let cas = builder.symbol(
            SymbolSpec::integer("SDRAMC_CR_CAS", 3)
                .range(1, 3)
                .label("CAS Latency (TCAS)")
                .parent(timing),
        )?;
        let refresh = builder.symbol(
            SymbolSpec::integer("SDRAMC_REFRESH_TIME_IN_MS", DEFAULT_REFRESH_MS)
                .range(1, i64::MAX)
                .label("Refresh time in ms")
                .parent(timing),
        )?;
        let master_clock = builder.lookup("core.MASTERCLK_FREQ")?;
        let count =
            builder.symbol(SymbolSpec::integer("SDRAMC_TR_COUNT", 0).parent(timing).hidden())?;
        builder.rule(count, &[refresh, master_clock, nr], move |ctx, _| {
            let rows = ctx.key(nr)?;
            let value = refresh_count(ctx.integer(refresh)?, rows, ctx.integer(master_clock)?)
                .ok_or_else(|| ctx.fail(format!("cannot derive a row count from {rows}")))?;
            Ok(Value::Int(value).into())
        })?;

        // Mode registers
        let mode_menu = builder.symbol(
            SymbolSpec::menu("SDRAMC_MR_MENU").label("SDRAMC Mode Register Configurations"),
        )?;
        let burst_length = builder.symbol(
            SymbolSpec::integer("SDRAMC_BURST_LENGTH", 0)
                .range(0, 7)
                .label("Burst Length")
                .parent(mode_menu),
        )?;
        let burst_type = builder.symbol(
            SymbolSpec::enum_key(
                "SDRAMC_BURST_TYPE",
                Domain::keys(["SEQUENTIAL", "INTERLEAVED"]).options().to_vec(),
                "SEQUENTIAL",
            )
            .label("Burst Type")
            .parent(mode_menu),
        )?;
        let mrs =
            builder.symbol(SymbolSpec::hex("SDRAMC_MRS_VALUE", 0).parent(mode_menu).hidden())?;
        builder.rule(mrs, &[burst_type, burst_length, cas], move |ctx, _| {
            let interleaved = ctx.key(burst_type)? == "INTERLEAVED";
            let (cas, length) = (register_value(ctx, cas)?, register_value(ctx, burst_length)?);
            Ok(Value::Hex(mode_register(interleaved, cas, length)).into())
        })?;

        // Low power
        let low_power = builder.symbol(
            SymbolSpec::menu("SDRAMC_LOW_POW_MENU")
                .label("SDRAMC Low-Power Configurations")
                .hidden(),
        )?;
        builder.rule(low_power, &[md], move |ctx, _| {
            Ok(Effect::Visible(ctx.key(md)? == "LPSDRAM"))
        })?;
        let txsr = builder.symbol(
            SymbolSpec::integer("SDRAMC_CR_TXSR", 10)
                .range(0, 15)
                .label("Exit Self Refresh to Active Time (TXSR)")
                .parent(low_power),
        )?;
        let lpcb = vec![
            EnumOption::new("DISABLED", 0, "Low Power mode is disabled"),
            EnumOption::new("SELF_REFRESH", 1, "Self Refresh"),
            EnumOption::new("POWER_DOWN", 2, "Power down"),
            EnumOption::new("DEEP_POWER_DOWN", 3, "Deep Power-Down"),
        ];
        builder.symbol(
            SymbolSpec::enum_key("SDRAMC_LPR_LPCB", lpcb, "DISABLED")
                .label("Low Power Configuration")
                .parent(low_power),
        )?;
        let timeouts = vec![
            EnumOption::new("LP_LAST_XFER", 0, "After the end of the last transfer"),
            EnumOption::new("LP_LAST_XFER_64", 1, "64 clock cycles after the last transfer"),
            EnumOption::new("LP_LAST_XFER_128", 2, "128 clock cycles after the last transfer"),
        ];
        builder.symbol(
            SymbolSpec::enum_key("SDRAMC_LPR_TIMEOUT", timeouts, "LP_LAST_XFER")
                .label("Select Low Power Entry")
                .parent(low_power),
        )?;
        let mut low_power_field = |name: &str, max: i64, label: &str| {
            builder.symbol(
                SymbolSpec::integer(name, 0)
                    .range(0, max)
                    .label(label)
                    .parent(low_power),
            )
        };
        let pasr = low_power_field("SDRAMC_LPR_PASR", 7, "Partial Array Self-Refresh (PACR)")?;
        let tcsr = low_power_field("SDRAMC_LPR_TCSR", 3, "Temperature Compensated Refresh (TCSR)")?;
        let ds = low_power_field("SDRAMC_LPR_DS", 3, "Drive Strength (DS)")?;
        let emrs =
            builder.symbol(SymbolSpec::hex("SDRAMC_EMRS_VALUE", 0).parent(mode_menu).hidden())?;
        builder.rule(emrs, &[pasr, tcsr, ds], move |ctx, _| {
            let value = extended_mode_register(
                register_value(ctx, pasr)?,
                register_value(ctx, tcsr)?,
                register_value(ctx, ds)?,
            );
            Ok(Value::Hex(value).into())
        })?;

        // Configuration register
        let layout = RegisterLayout::from_metadata(device, MODULE, "CR", KeySource::Name)?;
        let cr = builder.symbol(SymbolSpec::hex("SDRAMC_CR_VALUE", 0).width(32).hidden())?;
        let numeric = [
            ("CAS", cas),
            ("TWR", twr),
            ("TRC_TRFC", trc_trfc),
            ("TRP", trp),
            ("TRCD", trcd),
            ("TRAS", tras),
            ("TXSR", txsr),
        ];
        let selected = [("NC", nc), ("NR", nr), ("NB", nb), ("DBW", dbw)];
        let upstream: Vec<SymbolRef> =
            selected.iter().chain(numeric.iter()).map(|(_, s)| *s).collect();
        builder.rule(cr, &upstream, move |ctx, _| {
            let mut values = Vec::with_capacity(selected.len() + numeric.len());
            for (field, symbol) in selected {
                values.push((field, ctx.selected_value(symbol)?));
            }
            for (field, symbol) in numeric {
                values.push((field, register_value(ctx, symbol)?));
            }
            let composed = layout.compose(&values).map_err(|e| ctx.fail(e.to_string()))?;
            Ok(Value::Hex(composed).into())
        })?;

        // Outputs
        let templates = format!("../peripheral/sdramc_{module_id}/templates");
        let file = |kind, template: &str, output: String| {
            vec![env.peripheral_file(kind, &templates, template, &output, "peripheral/sdramc")]
        };
        builder.slot(
            "SDRAMC_H",
            file(ArtifactKind::Header, "plib_sdramc.h.ftl", format!("plib_sdramc{index}.h")),
        )?;
        builder.slot(
            "SDRAMC_C",
            file(ArtifactKind::Source, "plib_sdramc.c.ftl", format!("plib_sdramc{index}.c")),
        )?;
        builder.slot(
            "SDRAMC_SYSTEM_DEFINITIONS_H",
            vec![list_entry(
                format!("{templates}/system/system_definitions.h.ftl"),
                LIST_SYSTEM_DEFINITIONS,
            )],
        )?;
        builder.slot(
            "SDRAMC_SYSTEM_INITIALIZE_C",
            vec![list_entry(
                format!("{templates}/system/system_initialize.c.ftl"),
                LIST_SYSTEM_INIT_CORE,
            )],
        )?;
        debug!("declared {} for SDRAMC {module_id}", builder.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_count_truncates_the_clock_division_first() {
        assert_eq!(refresh_count(32, "ROW11", 133_000_000), Some(2078));
        assert_eq!(refresh_count(16_000, "ROW11", 133_000_000), Some(1_039_056));
        assert_eq!(refresh_count(64, "ROW13", 150_000_000), Some(1171));
    }

    #[test]
    fn refresh_count_needs_a_row_width() {
        assert_eq!(refresh_count(32, "ROWS", 133_000_000), None);
        assert_eq!(refresh_count(32, "1", 133_000_000), None);
        assert_eq!(refresh_count(32, "ROW99", 133_000_000), None);
    }

    #[test]
    fn mode_registers() {
        assert_eq!(mode_register(true, 2, 3), 43);
        assert_eq!(mode_register(false, 3, 0), 48);
        assert_eq!(extended_mode_register(1, 2, 3), 1 + 16 + 96);
    }
}
