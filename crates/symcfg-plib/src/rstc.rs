//! Reset controller.

use symcfg_core::{ArtifactKind, EnumOption, InstanceBuilder, Result, SymbolSpec};

use crate::component::Component;
use crate::core_config::LIST_SYSTEM_DEFINITIONS;
use crate::environment::{list_entry, Environment};

const MODULE: &str = "RSTC";

/// The RSTC component (`rstc0`).
pub struct Rstc;

impl Component for Rstc {
    fn name(&self) -> &'static str {
        "rstc"
    }

    fn module(&self) -> Option<&'static str> {
        Some(MODULE)
    }

    fn declare(&self, builder: &mut InstanceBuilder<'_>, env: &Environment<'_>) -> Result<()> {
        let device = env.device;
        let module_id = device.module_id(MODULE)?.to_string();
        let index = builder.index();

        builder.symbol(
            SymbolSpec::boolean("RSTC_ENABLE", true)
                .label("Use Reset Controller ?")
                .locked(),
        )?;
        builder.symbol(SymbolSpec::integer("RSTC_INDEX", index.into()).hidden())?;

        // One single-option entry per reset cause, in register order.
        let causes = device.bitfields(MODULE, "RCAUSE")?;
        builder.symbol(SymbolSpec::integer("RSTC_RCAUSE_LENGTH", causes.len() as i64).hidden())?;
        for (i, cause) in causes.iter().enumerate() {
            let caption = cause.attribute("caption").unwrap_or_default();
            let option = EnumOption::new(cause.name(), i as u64, caption);
            builder.symbol(
                SymbolSpec::enum_key(&format!("RSTC_RCAUSE{i}"), vec![option], cause.name())
                    .label(caption)
                    .hidden(),
            )?;
        }

        let templates = format!("../peripheral/rstc_{module_id}/templates");
        let file = |kind, template: &str, output: String| {
            vec![env.peripheral_file(kind, &templates, template, &output, "peripheral/rstc")]
        };
        builder.slot(
            "RSTC_HEADER",
            file(ArtifactKind::Header, "plib_rstc.h.ftl", format!("plib_rstc{index}.h")),
        )?;
        builder.slot(
            "RSTC_SOURCE",
            file(ArtifactKind::Source, "plib_rstc.c.ftl", format!("plib_rstc{index}.c")),
        )?;
        builder.slot(
            "RSTC_SYS_DEF",
            vec![list_entry(
                format!("{templates}/system/definitions.h.ftl"),
                LIST_SYSTEM_DEFINITIONS,
            )],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symcfg_core::{Session, Value};
    use symcfg_device::{DeviceTree, Node, ROOT_TAG};
    use symcfg_targets::{HostBindings, Processor};

    fn device() -> DeviceTree {
        let cause = |name: &str, caption: &str, mask: &str| {
            Node::new("bitfield")
                .with_attr("name", name)
                .with_attr("caption", caption)
                .with_attr("mask", mask)
        };
        DeviceTree::new(
            Node::new(ROOT_TAG).with_child(
                Node::new("modules").with_child(
                    Node::new("module")
                        .with_attr("name", "RSTC")
                        .with_attr("id", "U2239")
                        .with_child(
                            Node::new("register-group").with_attr("name", "RSTC").with_child(
                                Node::new("register")
                                    .with_attr("name", "RCAUSE")
                                    .with_child(cause("POR", "Power On Reset", "0x1"))
                                    .with_child(cause("EXT", "External Reset", "0x10")),
                            ),
                        ),
                ),
            ),
        )
    }

    #[test]
    fn one_entry_per_reset_cause() {
        let device = device();
        let host = HostBindings::new(Processor::atsamc21n18a()).unwrap();
        let env = Environment::new(&device, &host);
        let mut session = Session::new();
        let mut builder = session.instantiate("rstc0", 0).unwrap();
        Rstc.declare(&mut builder, &env).unwrap();
        builder.finish().unwrap();

        assert_eq!(session.value("rstc0.RSTC_RCAUSE_LENGTH").unwrap(), &Value::Int(2));
        assert_eq!(session.value("rstc0.RSTC_RCAUSE1").unwrap(), &Value::key("EXT"));
        let cause = session.symbol(session.lookup("rstc0.RSTC_RCAUSE1").unwrap()).unwrap();
        assert_eq!(cause.label(), "External Reset");
        assert_eq!(cause.selected_value(), Some(1));
        assert_eq!(
            session.active_artifact("rstc0.RSTC_HEADER").unwrap().template,
            "../peripheral/rstc_U2239/templates/plib_rstc.h.ftl"
        );
        assert!(session.set("rstc0.RSTC_ENABLE", Value::Bool(false)).is_err());
    }
}
