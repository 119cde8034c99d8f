//! The component trait and the registry of available components.

use symcfg_core::{ConfigError, Context, EnumOption, InstanceBuilder, Result, SymbolRef};

use crate::cmsis::Cmsis;
use crate::environment::Environment;
use crate::rstc::Rstc;
use crate::sdramc::Sdramc;
use crate::tmr1::Tmr1;

/// A configurable peripheral library.
///
/// `declare` creates the instance's symbols, rules and slots; the caller
/// finishes the builder. Declarations may read shared `core` symbols
/// through [`InstanceBuilder::lookup`].
pub trait Component {
    /// Short lowercase name, also the prefix of instance ids.
    fn name(&self) -> &'static str;

    /// Device module the component configures, if any.
    fn module(&self) -> Option<&'static str> {
        None
    }

    fn instance_id(&self, index: u32) -> String {
        format!("{}{index}", self.name())
    }

    fn declare(&self, builder: &mut InstanceBuilder<'_>, env: &Environment<'_>) -> Result<()>;
}

/// Names accepted by [`component`].
pub const COMPONENTS: &[&str] = &["sdramc", "tmr1", "rstc", "cmsis"];

/// Look up a peripheral component by name.
pub fn component(name: &str) -> Option<Box<dyn Component>> {
    match name.to_ascii_lowercase().as_str() {
        "sdramc" => Some(Box::new(Sdramc)),
        "tmr1" => Some(Box::new(Tmr1)),
        "rstc" => Some(Box::new(Rstc)),
        "cmsis" => Some(Box::new(Cmsis)),
        _ => None,
    }
}

/// Key of the option at `index`, for defaults given by position.
pub(crate) fn option_key(options: &[EnumOption], index: usize, field: &str) -> Result<String> {
    options
        .get(index)
        .map(|o| o.key.clone())
        .ok_or_else(|| ConfigError::MalformedMetadata {
            selector: field.to_string(),
            detail: format!(
                "expected at least {} enumerated values, found {}",
                index + 1,
                options.len()
            ),
        })
}

/// A non-negative integer symbol read as a register field value.
pub(crate) fn register_value(ctx: &Context<'_>, symbol: SymbolRef) -> Result<u64> {
    let value = ctx.integer(symbol)?;
    u64::try_from(value)
        .map_err(|_| ctx.fail(format!("{value} cannot be written to a register field")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_every_listed_component() {
        for name in COMPONENTS {
            let c = component(name).unwrap();
            assert_eq!(c.name(), *name);
        }
        assert!(component("SDRAMC").is_some());
        assert!(component("usart").is_none());
    }

    #[test]
    fn instance_ids() {
        assert_eq!(Sdramc.instance_id(0), "sdramc0");
        assert_eq!(Rstc.instance_id(0), "rstc0");
        assert_eq!(Tmr1.instance_id(0), "tmr1");
        assert_eq!(Cmsis.instance_id(0), "cmsis");
    }

    #[test]
    fn option_key_by_position() {
        let options = vec![
            EnumOption::new("SDRAM", 0, "SDRAM"),
            EnumOption::new("LPSDRAM", 1, "Low-power"),
        ];
        assert_eq!(option_key(&options, 1, "MD").unwrap(), "LPSDRAM");
        assert!(matches!(
            option_key(&options, 2, "MD"),
            Err(ConfigError::MalformedMetadata { .. })
        ));
    }
}
