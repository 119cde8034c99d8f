//! `symcfg device`: device description listing and validation.

use std::path::Path;

use anyhow::{bail, Context, Result};
use symcfg_device::{discover_devices, load_device_toml, validate_device};

pub fn list(project_dir: &Path) -> Result<()> {
    let devices = discover_devices(project_dir)?;
    if devices.is_empty() {
        println!("No device descriptions in {}", project_dir.join("devices").display());
        return Ok(());
    }
    println!("Device descriptions:");
    println!();
    for (name, path) in devices {
        println!("  {name:<22} {}", path.display());
    }
    Ok(())
}

pub fn validate(path: &Path) -> Result<()> {
    let device = load_device_toml(path).with_context(|| format!("loading {}", path.display()))?;
    println!(
        "{} ({}): {} interrupts, {} modules",
        device.name,
        device.architecture,
        device.interrupts.len(),
        device.modules.len()
    );
    if let Err(issues) = validate_device(&device) {
        for issue in &issues {
            println!("  {}: {}", issue.severity, issue.message);
        }
        let errors = issues.iter().filter(|i| i.severity == "error").count();
        if errors > 0 {
            bail!("{}: {errors} error(s)", device.name);
        }
    }
    Ok(())
}
