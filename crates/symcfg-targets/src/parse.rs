//! TOML parsing, serialization, validation, and discovery for processor definitions.
//!
//! Processor definitions are stored as `.target.toml` files in the `targets/`
//! directory of a project. They extend or override the built-in processors.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Result, TargetError};
use crate::processor::Processor;

/// A validation issue found in a processor definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Load a processor from a `.target.toml` file.
pub fn load_processor_toml(path: &Path) -> Result<Processor> {
    if !path.exists() {
        return Err(TargetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_processor_toml(&content)
}

/// Parse a processor from a TOML string.
pub fn parse_processor_toml(toml_str: &str) -> Result<Processor> {
    let processor: Processor = toml::from_str(toml_str)?;
    Ok(processor)
}

/// Serialize a processor to pretty TOML.
pub fn processor_to_toml(processor: &Processor) -> Result<String> {
    let toml_str = toml::to_string_pretty(processor)?;
    Ok(toml_str)
}

/// Validate a processor definition for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
pub fn validate_processor(processor: &Processor) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut error = |message: String| {
        issues.push(ValidationIssue {
            severity: "error",
            message,
        })
    };

    // 1. At least one toolchain, none listed twice
    if processor.toolchains.is_empty() {
        error("processor supports no toolchain".into());
    }
    let unique: BTreeSet<_> = processor.toolchains.iter().collect();
    if unique.len() != processor.toolchains.len() {
        error("a toolchain is listed more than once".into());
    }

    // 2. Clocks are non-zero
    if processor.clocks.processor_hz == 0 || processor.clocks.master_hz == 0 {
        error("clock frequencies must be non-zero".into());
    }

    // 3. Memory targets don't overlap and contain their start address
    let targets = &processor.memory_targets;
    for (i, a) in targets.iter().enumerate() {
        if a.size_bytes == 0 {
            error(format!("memory target '{}' has size 0", a.name));
        }
        if a.app_start_address < a.base_address || a.app_start_address >= a.end_address() {
            error(format!(
                "memory target '{}' starts its image at {:#x}, outside {:#x}..{:#x}",
                a.name,
                a.app_start_address,
                a.base_address,
                a.end_address()
            ));
        }
        for b in &targets[i + 1..] {
            if a.name == b.name {
                error(format!("memory target '{}' is defined twice", a.name));
            }
            if a.base_address < b.end_address() && b.base_address < a.end_address() {
                error(format!(
                    "memory targets '{}' ({:#x}..{:#x}) and '{}' ({:#x}..{:#x}) overlap",
                    a.name,
                    a.base_address,
                    a.end_address(),
                    b.name,
                    b.base_address,
                    b.end_address()
                ));
            }
        }
    }

    // 4. The default memory target exists, and is set whenever targets exist
    match &processor.default_memory {
        Some(name) if processor.memory_target(name).is_none() => {
            error(format!("default memory target '{name}' is not defined"));
        }
        None if !targets.is_empty() => error("memory targets defined without a default".into()),
        _ => {}
    }

    // 5. Exactly one startup file per toolchain
    for toolchain in &processor.toolchains {
        let count = processor.startup.iter().filter(|s| s.toolchain == *toolchain).count();
        if count != 1 {
            error(format!("toolchain {toolchain} has {count} startup files, expected 1"));
        }
    }

    // 6. Exactly one linker script per toolchain and memory target
    let memories: Vec<Option<&str>> = if targets.is_empty() {
        vec![None]
    } else {
        targets.iter().map(|m| Some(m.name.as_str())).collect()
    };
    for toolchain in &processor.toolchains {
        for memory in &memories {
            let count = processor
                .linker
                .iter()
                .filter(|l| l.toolchain == *toolchain && l.memory.as_deref() == *memory)
                .count();
            if count != 1 {
                error(format!(
                    "toolchain {toolchain} with memory {} has {count} linker scripts, expected 1",
                    memory.unwrap_or("(fixed)")
                ));
            }
        }
    }

    // 7. Templates and options for unsupported toolchains are dead weight
    let startup = processor.startup.iter().map(|s| s.toolchain);
    let settings = processor.settings.iter().map(|s| s.toolchain);
    for toolchain in startup.chain(processor.linker.iter().map(|l| l.toolchain)).chain(settings) {
        if !processor.supports(toolchain) {
            issues.push(ValidationIssue {
                severity: "warning",
                message: format!("template or option for unsupported toolchain {toolchain}"),
            });
            break;
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.target.toml` for a new processor.
///
/// Seeds from the SAME70Q21B definition with the given name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut processor = Processor::atsame70q21b();
    processor.name = name.into();
    processor_to_toml(&processor)
}

/// Discover all `.target.toml` files in a project's `targets/` directory.
///
/// Returns a list of (target_name, file_path) pairs.
pub fn discover_targets(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let targets_dir = project_dir.join("targets");
    if !targets_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut targets = Vec::new();
    for entry in std::fs::read_dir(&targets_dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".target.toml"))
            .map(str::to_string);
        if let Some(name) = name {
            targets.push((name, path));
        }
    }
    targets.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(targets)
}

/// Resolve a processor by name: a project target file wins over a built-in.
pub fn find_processor(project_dir: &Path, name: &str) -> Result<Processor> {
    for (file_name, path) in discover_targets(project_dir)? {
        if file_name.eq_ignore_ascii_case(name) {
            return load_processor_toml(&path);
        }
    }
    Processor::builtin(name).ok_or_else(|| TargetError::UnknownProcessor(name.into()))
}
