//! ARM CMSIS headers.
//!
//! Copies the core and DSP headers of the CMSIS pack into the generated
//! project. The core set follows the device architecture: Cortex-M parts
//! get `CMSIS/Core` with their own `core_cm*.h`, Cortex-A parts get
//! `CMSIS/Core_A`. Template paths are relative to the CMSIS pack directory.

use log::debug;
use symcfg_core::{ArtifactDescriptor, ArtifactKind, ConfigError, InstanceBuilder, Result};
use symcfg_device::ROOT_TAG;

use crate::component::Component;
use crate::environment::Environment;

const CORE_M_DIR: &str = "CMSIS/Core/Include";
const CORE_A_DIR: &str = "CMSIS/Core_A/Include";
const DSP_DIR: &str = "CMSIS/DSP/Include";

const CORE_M_HEADERS: [&str; 7] = [
    "cmsis_compiler.h",
    "cmsis_iccarm.h",
    "cmsis_gcc.h",
    "cmsis_armcc.h",
    "cmsis_armclang.h",
    "cmsis_armclang_ltm.h",
    "tz_context.h",
];
const CORE_A_HEADERS: [&str; 5] =
    ["cmsis_compiler.h", "cmsis_gcc.h", "cmsis_iccarm.h", "cmsis_cp15.h", "core_ca.h"];
const DSP_HEADERS: [&str; 3] = ["arm_common_tables.h", "arm_const_structs.h", "arm_math.h"];

/// The CMSIS core flavour of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmsisCore {
    /// Cortex-M, with the lowercase core suffix (`m7`, `m0plus`, `m23`).
    M(String),
    A,
}

impl CmsisCore {
    /// Parse a device architecture such as `CORTEX-M7`. Non-ARM
    /// architectures have no CMSIS core.
    pub fn from_architecture(architecture: &str) -> Option<Self> {
        let upper = architecture.to_ascii_uppercase();
        let suffix = upper.strip_prefix("CORTEX-")?.to_ascii_lowercase();
        if suffix.starts_with('m') {
            Some(CmsisCore::M(suffix))
        } else if suffix.starts_with('a') {
            Some(CmsisCore::A)
        } else {
            None
        }
    }

    /// Pack directory of the core headers.
    pub fn include_dir(&self) -> &'static str {
        match self {
            CmsisCore::M(_) => CORE_M_DIR,
            CmsisCore::A => CORE_A_DIR,
        }
    }

    /// Core headers in copy order.
    pub fn headers(&self) -> Vec<String> {
        match self {
            CmsisCore::M(core) => {
                let mut headers: Vec<String> = CORE_M_HEADERS.map(String::from).to_vec();
                headers.push(format!("core_c{core}.h"));
                // Cortex-M23 carries the ARMv8-M MPU.
                if core == "m23" {
                    headers.push("cmsis_version.h".into());
                    headers.push("mpu_armv8.h".into());
                } else {
                    headers.push("mpu_armv7.h".into());
                    headers.push("cmsis_version.h".into());
                }
                headers
            }
            CmsisCore::A => CORE_A_HEADERS.map(String::from).to_vec(),
        }
    }

    /// Slot name of a core header: `CORE_CM7_H`, `CORE_A_CMSIS_GCC_H`.
    pub fn slot_name(&self, header: &str) -> String {
        match self {
            CmsisCore::M(_) => header_slot(header),
            CmsisCore::A => format!("CORE_A_{}", header_slot(header)),
        }
    }
}

fn header_slot(header: &str) -> String {
    let stem = header.strip_suffix(".h").unwrap_or(header);
    format!("{}_H", stem.to_ascii_uppercase())
}

fn pack_header(dir: &str, header: &str) -> ArtifactDescriptor {
    ArtifactDescriptor::new(ArtifactKind::Header, format!("{dir}/{header}"), header)
        .with_location(format!("../../packs/CMSIS/{dir}/"), format!("packs/CMSIS/{dir}/"))
        .with_markup(false)
        .with_overwrite(true)
}

/// The CMSIS component (`cmsis`).
pub struct Cmsis;

impl Component for Cmsis {
    fn name(&self) -> &'static str {
        "cmsis"
    }

    fn instance_id(&self, _index: u32) -> String {
        self.name().to_string()
    }

    fn declare(&self, builder: &mut InstanceBuilder<'_>, env: &Environment<'_>) -> Result<()> {
        let architecture = env.device.device_attribute("architecture")?;
        let core = CmsisCore::from_architecture(architecture).ok_or_else(|| {
            ConfigError::MalformedMetadata {
                selector: format!("/{ROOT_TAG}/devices/device"),
                detail: format!("architecture {architecture} has no CMSIS core"),
            }
        })?;
        debug!("cmsis: {architecture} uses {}", core.include_dir());

        for header in core.headers() {
            builder.slot(&core.slot_name(&header), vec![pack_header(core.include_dir(), &header)])?;
        }
        for header in DSP_HEADERS {
            builder.slot(&header_slot(header), vec![pack_header(DSP_DIR, header)])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symcfg_core::Session;
    use symcfg_device::{DeviceTree, Node};
    use symcfg_targets::{HostBindings, Processor};

    fn device(architecture: &str) -> DeviceTree {
        DeviceTree::new(Node::new(ROOT_TAG).with_child(
            Node::new("devices").with_child(
                Node::new("device")
                    .with_attr("name", "TEST")
                    .with_attr("architecture", architecture),
            ),
        ))
    }

    fn declare(architecture: &str) -> (Session, Result<()>) {
        let device = device(architecture);
        let host = HostBindings::new(Processor::atsame70q21b()).unwrap();
        let env = Environment::new(&device, &host);
        let mut session = Session::new();
        let mut builder = session.instantiate("cmsis", 0).unwrap();
        let result = match Cmsis.declare(&mut builder, &env) {
            Ok(()) => builder.finish().map(|_| ()),
            Err(err) => Err(builder.abort(err)),
        };
        (session, result)
    }

    #[test]
    fn architecture_selects_the_core() {
        assert_eq!(CmsisCore::from_architecture("CORTEX-M7"), Some(CmsisCore::M("m7".into())));
        assert_eq!(
            CmsisCore::from_architecture("CORTEX-M0PLUS"),
            Some(CmsisCore::M("m0plus".into()))
        );
        assert_eq!(CmsisCore::from_architecture("CORTEX-A5"), Some(CmsisCore::A));
        assert_eq!(CmsisCore::from_architecture("MIPS"), None);
    }

    #[test]
    fn cortex_m23_swaps_the_mpu_header() {
        let m7 = CmsisCore::M("m7".into()).headers();
        assert!(m7.contains(&"core_cm7.h".to_string()));
        assert!(m7.contains(&"mpu_armv7.h".to_string()));
        let m23 = CmsisCore::M("m23".into()).headers();
        assert!(m23.contains(&"mpu_armv8.h".to_string()));
        assert!(!m23.contains(&"mpu_armv7.h".to_string()));
        assert_eq!(m7.len(), m23.len());
    }

    #[test]
    fn cortex_m_slots() {
        let (session, result) = declare("CORTEX-M23");
        result.unwrap();
        let core = session.active_artifact("cmsis.CORE_CM23_H").unwrap();
        assert_eq!(core.template, "CMSIS/Core/Include/core_cm23.h");
        assert_eq!(core.destination, "../../packs/CMSIS/CMSIS/Core/Include/");
        assert_eq!(core.project_path, "packs/CMSIS/CMSIS/Core/Include/");
        assert!(!core.markup);
        assert!(session.active_artifact("cmsis.MPU_ARMV8_H").is_ok());
        assert!(session.active_artifact("cmsis.MPU_ARMV7_H").is_err());
        let dsp = session.active_artifact("cmsis.ARM_MATH_H").unwrap();
        assert_eq!(dsp.project_path, "packs/CMSIS/CMSIS/DSP/Include/");
    }

    #[test]
    fn cortex_a_slots() {
        let (session, result) = declare("CORTEX-A5");
        result.unwrap();
        let cp15 = session.active_artifact("cmsis.CORE_A_CMSIS_CP15_H").unwrap();
        assert_eq!(cp15.template, "CMSIS/Core_A/Include/cmsis_cp15.h");
        assert!(session.active_artifact("cmsis.CORE_A_CORE_CA_H").is_ok());
        assert!(session.active_artifact("cmsis.CMSIS_GCC_H").is_err());
        assert!(session.active_artifact("cmsis.ARM_COMMON_TABLES_H").is_ok());
    }

    #[test]
    fn mips_has_no_cmsis() {
        let (session, result) = declare("MIPS");
        assert!(matches!(result, Err(ConfigError::MalformedMetadata { .. })));
        assert!(!session.instance("cmsis").unwrap().is_live());
    }
}
