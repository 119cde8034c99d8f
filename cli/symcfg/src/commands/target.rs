//! `symcfg target`: processor listing, description and validation.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use symcfg_targets::{
    discover_targets, find_processor, generate_template, processor_to_toml, validate_processor,
    Processor,
};

/// List built-in processors and the project's `targets/*.target.toml` files.
pub fn list(project_dir: &Path) -> Result<()> {
    println!("Built-in processors:");
    println!();
    for p in Processor::builtins() {
        println!("  {:<22} {} ({}, {})", p.name, p.family, p.architecture, toolchains(&p));
    }

    let project = discover_targets(project_dir)?;
    if !project.is_empty() {
        println!();
        println!("Project processors (targets/):");
        println!();
        for (name, path) in project {
            println!("  {name:<22} {}", path.display());
        }
    }
    println!();
    println!("Use 'symcfg target describe <name>' for details.");
    Ok(())
}

fn toolchains(p: &Processor) -> String {
    p.toolchains.iter().map(|t| t.key()).collect::<Vec<_>>().join("/")
}

/// Describe a processor in detail, or print it as TOML.
pub fn describe(name: &str, project_dir: &Path, format: Option<&str>) -> Result<()> {
    let p = find_processor(project_dir, name).with_context(|| {
        format!("unknown target: '{name}'. Use 'symcfg target list' to see available targets.")
    })?;

    match format {
        Some("toml") => {
            print!("{}", processor_to_toml(&p)?);
            return Ok(());
        }
        Some(other) => bail!("unknown format '{other}' (expected 'toml')"),
        None => {}
    }

    println!("=== Processor: {} ===", p.name);
    println!("Family:       {}", p.family);
    println!("Architecture: {}", p.architecture);
    println!("Interrupts:   {:?}", p.architecture.interrupt_controller());
    println!("Toolchains:   {}", toolchains(&p));
    println!();

    println!("--- Clocks ---");
    println!("  Processor: {} Hz", p.clocks.processor_hz);
    println!("  Master:    {} Hz", p.clocks.master_hz);
    println!();

    if !p.memory_targets.is_empty() {
        println!("--- Memory targets ---");
        for m in &p.memory_targets {
            let default = if p.default_memory.as_deref() == Some(m.name.as_str()) {
                " [default]"
            } else {
                ""
            };
            println!(
                "  {}: 0x{:08X} - 0x{:08X} ({} bytes), app start {}{default}",
                m.name,
                m.base_address,
                m.end_address(),
                m.size_bytes,
                m.app_start_literal(),
            );
        }
        println!();
    }

    println!("--- Startup ---");
    for s in &p.startup {
        println!("  {:<5} {} -> {}", s.toolchain.key(), s.template, s.output);
    }
    println!();

    println!("--- Linker ---");
    for l in &p.linker {
        let memory = l.memory.as_deref().unwrap_or("-");
        println!("  {:<5} {:<5} {} -> {}", l.toolchain.key(), memory, l.template, l.output);
    }
    Ok(())
}

/// Write `targets/<name>.target.toml` seeded from a built-in processor.
pub fn add(name: &str, project_dir: &Path) -> Result<()> {
    let targets_dir = project_dir.join("targets");
    let path = targets_dir.join(format!("{name}.target.toml"));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::create_dir_all(&targets_dir)
        .with_context(|| format!("creating {}", targets_dir.display()))?;
    fs::write(&path, generate_template(name)?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

/// Validate a processor definition and report every issue found.
pub fn validate(name: &str, project_dir: &Path) -> Result<()> {
    let p = find_processor(project_dir, name)?;
    match validate_processor(&p) {
        Ok(()) => {
            println!("{}: valid", p.name);
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                println!("  {}: {}", issue.severity, issue.message);
            }
            let errors = issues.iter().filter(|i| i.severity == "error").count();
            if errors > 0 {
                bail!("{}: {errors} error(s)", p.name);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_builtins() {
        let dir = tempfile::tempdir().unwrap();
        for p in Processor::builtins() {
            assert!(describe(&p.name, dir.path(), None).is_ok());
        }
        assert!(describe("atsame70q21b", dir.path(), Some("toml")).is_ok());
        assert!(describe("atsame70q21b", dir.path(), Some("yaml")).is_err());
        assert!(describe("nonexistent", dir.path(), None).is_err());
    }

    #[test]
    fn add_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        add("board", dir.path()).unwrap();
        assert!(dir.path().join("targets/board.target.toml").is_file());
        assert!(add("board", dir.path()).is_err());
        assert!(validate("board", dir.path()).is_ok());
        assert!(list(dir.path()).is_ok());
    }

    #[test]
    fn invalid_definition_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Processor::atsamc21n18a();
        p.toolchains.clear();
        fs::create_dir_all(dir.path().join("targets")).unwrap();
        fs::write(
            dir.path().join("targets/broken.target.toml"),
            processor_to_toml(&p).unwrap(),
        )
        .unwrap();
        assert!(validate("broken", dir.path()).is_err());
    }
}
