//! `symcfg init`: write a starter manifest.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;
use symcfg_targets::Processor;

use crate::manifest::{SymcfgManifest, MANIFEST_FILE};

pub fn run(dir: &Path, name: &str, processor: &str) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    if Processor::builtin(processor).is_none() {
        warn!("'{processor}' is not a built-in processor; add targets/{processor}.target.toml");
    }
    fs::write(&path, SymcfgManifest::template(name, processor))
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_once() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), "demo", "ATSAMC21N18A").unwrap();
        let manifest = SymcfgManifest::load(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.target.processor, "ATSAMC21N18A");
        assert!(run(dir.path(), "demo", "ATSAMC21N18A").is_err());
    }
}
