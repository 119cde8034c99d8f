//! `symcfg resolve`: build a project from the manifest and print the result.

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use symcfg_device::load_device_toml;
use symcfg_plib::Project;
use symcfg_targets::{find_processor, Clocks, HostBindings};

use crate::manifest::SymcfgManifest;
use crate::Format;

/// Create the project the manifest describes: device, host bindings,
/// component instances in order, then the overrides in order.
pub fn open_project(project_dir: &Path, manifest: &SymcfgManifest) -> Result<Project> {
    let issues = manifest.validate();
    if !issues.is_empty() {
        bail!("invalid manifest:\n  {}", issues.join("\n  "));
    }
    let target = &manifest.target;

    let device_path = project_dir.join(&target.device);
    let device = load_device_toml(&device_path)
        .with_context(|| format!("loading {}", device_path.display()))?
        .to_tree();

    let processor = find_processor(project_dir, &target.processor)?;
    let mut host =
        HostBindings::new(processor)?.with_configuration(manifest.project.configuration.as_str());
    if let Some(toolchain) = target.toolchain {
        host = host.with_toolchain(toolchain)?;
    }
    if let Some(memory) = &target.memory {
        host = host.with_memory(memory)?;
    }
    if target.processor_hz.is_some() || target.master_hz.is_some() {
        let clocks = Clocks {
            processor_hz: target.processor_hz.unwrap_or(host.clocks.processor_hz),
            master_hz: target.master_hz.unwrap_or(host.clocks.master_hz),
        };
        host = host.with_clocks(clocks)?;
    }

    let mut project = Project::new(Box::new(device), host)?;
    for entry in &manifest.components {
        let id = project
            .add_named(&entry.name, entry.index)
            .with_context(|| format!("instantiating {}{}", entry.name, entry.index))?;
        info!("instantiated {id}");
    }
    for o in &manifest.overrides {
        let report = project
            .set(&o.symbol, &o.value)
            .with_context(|| format!("applying override {} = {}", o.symbol, o.value))?;
        info!("{} = {}: {} symbols changed", o.symbol, o.value, report.changes.len());
    }
    Ok(project)
}

pub fn run(
    project_dir: &Path,
    manifest: &SymcfgManifest,
    format: Format,
    hidden: bool,
    digest: bool,
) -> Result<()> {
    let project = open_project(project_dir, manifest)?;
    let snapshot = project.snapshot()?;

    match format {
        Format::Text => {
            println!("=== {} ({}) ===", manifest.project.name, project.host().processor.name);
            print!("{}", snapshot.format_text(hidden));
        }
        Format::Json => println!("{}", snapshot.to_json()?),
    }
    if digest {
        println!("digest: {}", snapshot.digest()?);
    }
    Ok(())
}
