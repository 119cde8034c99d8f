//! TOML device descriptions.
//!
//! Devices are described in `.device.toml` files under a project's
//! `devices/` directory. A description is converted into the node tree that
//! [`DeviceMetadata`](crate::DeviceMetadata) selectors address:
//!
//! ```text
//! /avr-tools-device-file/devices/device/parameters/param
//! /avr-tools-device-file/devices/device/interrupts/interrupt
//! /avr-tools-device-file/modules/module/register-group/register/bitfield
//! /avr-tools-device-file/modules/module/value-group/value
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};
use crate::metadata::{DeviceTree, ROOT_TAG};
use crate::node::{parse_literal, Node};

/// Top-level device description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceDescription {
    pub name: String,
    pub family: String,
    pub architecture: String,
    #[serde(default)]
    pub series: Option<String>,
    /// Named device parameters (`__NVIC_PRIO_BITS`, ...), kept as literals.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub interrupts: Vec<InterruptDescription>,
    #[serde(default)]
    pub modules: Vec<ModuleDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InterruptDescription {
    pub index: i32,
    pub name: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alternate_name: Option<String>,
    #[serde(default)]
    pub alternate_caption: Option<String>,
    #[serde(default)]
    pub module_instance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDescription {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub registers: Vec<RegisterDescription>,
    #[serde(default)]
    pub value_groups: Vec<ValueGroupDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegisterDescription {
    pub name: String,
    pub offset: String,
    #[serde(default = "default_register_size")]
    pub size: u32,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub bitfields: Vec<BitfieldDescription>,
}

fn default_register_size() -> u32 {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BitfieldDescription {
    pub name: String,
    pub mask: String,
    #[serde(default)]
    pub caption: String,
    /// Name of the value group enumerating this field's settings.
    #[serde(default)]
    pub values: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValueGroupDescription {
    pub name: String,
    #[serde(default)]
    pub values: Vec<ValueDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValueDescription {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub caption: String,
}

/// A validation issue found in a device description.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl DeviceDescription {
    /// Build the queryable node tree.
    pub fn to_tree(&self) -> DeviceTree {
        let params = self.parameters.iter().map(|(name, value)| {
            Node::new("param").with_attr("name", name).with_attr("value", value)
        });
        let interrupts = self.interrupts.iter().map(|i| {
            Node::new("interrupt")
                .with_attr("index", i.index.to_string())
                .with_attr("name", &i.name)
                .with_attr("caption", &i.caption)
                .with_opt_attr("header:alternate-name", i.alternate_name.as_deref())
                .with_opt_attr("header:alternate-caption", i.alternate_caption.as_deref())
                .with_opt_attr("module-instance", i.module_instance.as_deref())
        });
        let device = Node::new("device")
            .with_attr("name", &self.name)
            .with_attr("family", &self.family)
            .with_attr("architecture", &self.architecture)
            .with_opt_attr("series", self.series.as_deref())
            .with_child(Node::new("parameters").with_children(params))
            .with_child(Node::new("interrupts").with_children(interrupts));

        let modules = self.modules.iter().map(ModuleDescription::to_node);
        DeviceTree::new(
            Node::new(ROOT_TAG)
                .with_child(Node::new("devices").with_child(device))
                .with_child(Node::new("modules").with_children(modules)),
        )
    }
}

impl ModuleDescription {
    fn to_node(&self) -> Node {
        let registers = self.registers.iter().map(|r| {
            let fields = r.bitfields.iter().map(|b| {
                Node::new("bitfield")
                    .with_attr("name", &b.name)
                    .with_attr("caption", &b.caption)
                    .with_attr("mask", &b.mask)
                    .with_opt_attr("values", b.values.as_deref())
            });
            Node::new("register")
                .with_attr("name", &r.name)
                .with_attr("offset", &r.offset)
                .with_attr("size", r.size.to_string())
                .with_attr("caption", &r.caption)
                .with_children(fields)
        });
        let groups = self.value_groups.iter().map(|g| {
            let values = g.values.iter().map(|v| {
                Node::new("value")
                    .with_attr("name", &v.name)
                    .with_attr("caption", &v.caption)
                    .with_attr("value", &v.value)
            });
            Node::new("value-group").with_attr("name", &g.name).with_children(values)
        });
        Node::new("module")
            .with_attr("name", &self.name)
            .with_attr("id", &self.id)
            .with_attr("caption", &self.caption)
            .with_child(
                Node::new("register-group")
                    .with_attr("name", &self.name)
                    .with_children(registers),
            )
            .with_children(groups)
    }
}

/// Load a device description from a `.device.toml` file.
pub fn load_device_toml(path: &Path) -> Result<DeviceDescription> {
    if !path.exists() {
        return Err(DeviceError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let device = parse_device_toml(&content)?;
    debug!("loaded device {} from {}", device.name, path.display());
    Ok(device)
}

/// Parse a device description from a TOML string.
pub fn parse_device_toml(toml_str: &str) -> Result<DeviceDescription> {
    let device: DeviceDescription = toml::from_str(toml_str)?;
    Ok(device)
}

/// Serialize a device description to pretty TOML.
pub fn device_to_toml(device: &DeviceDescription) -> Result<String> {
    let toml_str = toml::to_string_pretty(device)?;
    Ok(toml_str)
}

/// Validate a device description for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
pub fn validate_device(
    device: &DeviceDescription,
) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut error = |message: String| {
        issues.push(ValidationIssue {
            severity: "error",
            message,
        })
    };

    let mut indices = BTreeSet::new();
    for interrupt in &device.interrupts {
        if !indices.insert(interrupt.index) {
            error(format!("interrupt index {} is declared twice", interrupt.index));
        }
    }

    let mut modules = BTreeSet::new();
    for module in &device.modules {
        if !modules.insert(module.name.as_str()) {
            error(format!("module '{}' is declared twice", module.name));
        }
        let groups: BTreeSet<&str> = module.value_groups.iter().map(|g| g.name.as_str()).collect();

        for register in &module.registers {
            if parse_literal(&register.offset).is_none() {
                error(format!(
                    "register {}.{} has non-numeric offset '{}'",
                    module.name, register.name, register.offset
                ));
            }
            let mut used = 0u64;
            for field in &register.bitfields {
                let Some(mask) = parse_literal(&field.mask).filter(|m| *m != 0) else {
                    error(format!(
                        "bitfield {}.{}.{} has invalid mask '{}'",
                        module.name, register.name, field.name, field.mask
                    ));
                    continue;
                };
                if used & mask != 0 {
                    error(format!(
                        "bitfield {}.{}.{} overlaps another field of the register",
                        module.name, register.name, field.name
                    ));
                }
                used |= mask;
                if let Some(group) = &field.values {
                    if !groups.contains(group.as_str()) {
                        error(format!(
                            "bitfield {}.{}.{} refers to unknown value group '{group}'",
                            module.name, register.name, field.name
                        ));
                    }
                }
            }
        }

        for group in &module.value_groups {
            for value in &group.values {
                if parse_literal(&value.value).is_none() {
                    error(format!(
                        "value {}.{} has non-numeric value '{}'",
                        group.name, value.name, value.value
                    ));
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Discover all `.device.toml` files in a project's `devices/` directory.
///
/// Returns a list of (device_name, file_path) pairs.
pub fn discover_devices(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let devices_dir = project_dir.join("devices");
    if !devices_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut devices = Vec::new();
    for entry in std::fs::read_dir(&devices_dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".device.toml"))
            .map(str::to_string);
        if let Some(name) = name {
            devices.push((name, path));
        }
    }
    devices.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DeviceMetadata;

    const MINIMAL: &str = r#"
name = "ATSAMC21N18A"
family = "SAMC21"
architecture = "CORTEX-M0PLUS"

[parameters]
__NVIC_PRIO_BITS = "2"

[[interrupts]]
index = 0
name = "SYSTEM"
caption = "System"
module-instance = "RSTC"

[[modules]]
name = "RSTC"
id = "U2239"

[[modules.registers]]
name = "RCAUSE"
offset = "0x0"
size = 1

[[modules.registers.bitfields]]
name = "POR"
caption = "Power On Reset"
mask = "0x1"

[[modules.registers.bitfields]]
name = "EXT"
caption = "External Reset"
mask = "0x10"
"#;

    #[test]
    fn parse_and_query() {
        let device = parse_device_toml(MINIMAL).unwrap();
        assert_eq!(device.name, "ATSAMC21N18A");
        let tree = device.to_tree();
        assert_eq!(tree.module_id("RSTC").unwrap(), "U2239");
        assert_eq!(tree.parameter_value("__NVIC_PRIO_BITS").unwrap(), Some(2));
        let rcause = tree
            .children(r#"/avr-tools-device-file/modules/module@[name="RSTC"]/register-group@[name="RSTC"]/register@[name="RCAUSE"]"#)
            .unwrap();
        assert_eq!(rcause.len(), 2);
        assert_eq!(rcause[1].attribute("caption"), Some("External Reset"));
        assert_eq!(tree.interrupt_for("RSTC").unwrap().name, "SYSTEM");
    }

    #[test]
    fn round_trip() {
        let device = parse_device_toml(MINIMAL).unwrap();
        let again = parse_device_toml(&device_to_toml(&device).unwrap()).unwrap();
        assert_eq!(device, again);
    }

    #[test]
    fn parse_invalid_returns_error() {
        assert!(parse_device_toml("name = [").is_err());
        assert!(parse_device_toml("name = \"x\"").is_err());
    }

    #[test]
    fn validate_minimal() {
        assert!(validate_device(&parse_device_toml(MINIMAL).unwrap()).is_ok());
    }

    #[test]
    fn validate_overlapping_masks_and_bad_groups() {
        let mut device = parse_device_toml(MINIMAL).unwrap();
        let fields = &mut device.modules[0].registers[0].bitfields;
        fields[1].mask = "0x3".into();
        fields[1].values = Some("RSTC_RCAUSE__EXT".into());
        let issues = validate_device(&device).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("overlaps")));
        assert!(issues.iter().any(|i| i.message.contains("unknown value group")));
    }

    #[test]
    fn validate_duplicates() {
        let mut device = parse_device_toml(MINIMAL).unwrap();
        device.interrupts.push(device.interrupts[0].clone());
        device.modules.push(device.modules[0].clone());
        let issues = validate_device(&device).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("interrupt index 0")));
        assert!(issues.iter().any(|i| i.message.contains("module 'RSTC'")));
    }

    #[test]
    fn load_not_found() {
        let result = load_device_toml(Path::new("/nonexistent/x.device.toml"));
        assert!(matches!(result.unwrap_err(), DeviceError::NotFound { .. }));
    }

    #[test]
    fn discover_devices_finds_files() {
        let dir = tempfile::tempdir().unwrap();
        let devices_dir = dir.path().join("devices");
        std::fs::create_dir_all(&devices_dir).unwrap();
        std::fs::write(devices_dir.join("b.device.toml"), MINIMAL).unwrap();
        std::fs::write(devices_dir.join("a.device.toml"), MINIMAL).unwrap();
        std::fs::write(devices_dir.join("notes.txt"), "ignore me").unwrap();

        let devices = discover_devices(dir.path()).unwrap();
        let names: Vec<_> = devices.iter().map(|d| d.0.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(load_device_toml(&devices[0].1).unwrap().family, "SAMC21");
    }
}
