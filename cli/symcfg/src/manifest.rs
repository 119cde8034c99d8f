//! `symcfg.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use symcfg_plib::COMPONENTS;
use symcfg_targets::Toolchain;

pub const MANIFEST_FILE: &str = "symcfg.toml";

/// The top-level manifest structure for a configuration project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SymcfgManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Device and host selection (required).
    pub target: TargetConfig,
    /// Peripheral instances, created in order after `core`.
    #[serde(default)]
    pub components: Vec<ComponentEntry>,
    /// Symbol writes applied in order once every component exists.
    #[serde(default)]
    pub overrides: Vec<Override>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    pub name: String,
    /// Configuration name used in generated project paths.
    #[serde(default = "default_configuration")]
    pub configuration: String,
}

fn default_configuration() -> String {
    "default".to_string()
}

/// Device description and processor selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Path of the `.device.toml` file, relative to the manifest.
    pub device: PathBuf,
    /// Processor name: a `targets/*.target.toml` file or a built-in.
    pub processor: String,
    #[serde(default)]
    pub toolchain: Option<Toolchain>,
    /// Memory target the application runs from.
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub processor_hz: Option<u64>,
    #[serde(default)]
    pub master_hz: Option<u64>,
}

/// One component instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub name: String,
    #[serde(default)]
    pub index: u32,
}

/// A textual symbol write, parsed by the symbol's kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Override {
    pub symbol: String,
    pub value: String,
}

impl SymcfgManifest {
    /// Search upward from `start_dir` for a `symcfg.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Load a manifest from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Problems that would make resolution fail before any instance is
    /// created.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.project.configuration.trim().is_empty() {
            issues.push("project.configuration is empty".to_string());
        }
        if self.target.processor_hz == Some(0) || self.target.master_hz == Some(0) {
            issues.push("clock frequencies must be non-zero".to_string());
        }
        let mut seen = Vec::new();
        for entry in &self.components {
            if !COMPONENTS.contains(&entry.name.to_ascii_lowercase().as_str()) {
                issues.push(format!(
                    "unknown component '{}' (available: {})",
                    entry.name,
                    COMPONENTS.join(", ")
                ));
            }
            let key = (entry.name.to_ascii_lowercase(), entry.index);
            if seen.contains(&key) {
                issues.push(format!(
                    "component '{}' index {} listed twice",
                    entry.name, entry.index
                ));
            }
            seen.push(key);
        }
        for o in &self.overrides {
            if !o.symbol.contains('.') {
                issues.push(format!(
                    "override '{}' is not of the form <instance>.<symbol>",
                    o.symbol
                ));
            }
        }
        issues
    }

    /// Generate a starter manifest for a processor.
    pub fn template(name: &str, processor: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
configuration = "default"

[target]
device = "devices/{device}.device.toml"
processor = "{processor}"
"#,
            device = processor.to_ascii_lowercase()
        )
    }
}
