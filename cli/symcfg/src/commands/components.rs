//! `symcfg components`: available components and the capability table.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use symcfg_device::load_device_toml;
use symcfg_plib::capability::table;
use symcfg_plib::{device_capabilities, modules_with, Capability, COMPONENTS};

fn join(caps: &[Capability]) -> String {
    caps.iter().map(|c| c.key()).collect::<Vec<_>>().join(", ")
}

/// Rows of the capability listing: `(module, capabilities)`.
pub fn rows(device: Option<&Path>, capability: Option<&str>) -> Result<Vec<(String, String)>> {
    let wanted = capability
        .map(|key| {
            Capability::from_key(key).ok_or_else(|| {
                let known: Vec<_> = Capability::ALL.iter().map(|c| c.key()).collect();
                anyhow!("unknown capability '{key}' (known: {})", known.join(", "))
            })
        })
        .transpose()?;

    let rows = match device {
        Some(path) => {
            let device = load_device_toml(path)
                .with_context(|| format!("loading {}", path.display()))?
                .to_tree();
            device_capabilities(&device)?
                .into_iter()
                .filter(|(_, caps)| wanted.map_or(true, |w| caps.contains(&w)))
                .map(|(module, caps)| (module, join(caps)))
                .collect()
        }
        None => match wanted {
            Some(w) => modules_with(w)
                .into_iter()
                .map(|key| (key.to_string(), w.key().to_string()))
                .collect(),
            None => table().map(|(key, caps)| (key.to_string(), join(caps))).collect(),
        },
    };
    Ok(rows)
}

pub fn run(device: Option<&Path>, capability: Option<&str>) -> Result<()> {
    println!("Components: {}", COMPONENTS.join(", "));
    println!();
    let rows = rows(device, capability)?;
    if rows.is_empty() {
        println!("No matching modules.");
        return Ok(());
    }
    println!("Capabilities:");
    for (module, caps) in rows {
        println!("  {module:<20} {caps}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_table() {
        let found = rows(None, None).unwrap();
        assert!(found.iter().any(|(m, c)| m == "SERCOM_U2201" && c == "UART, SPI, I2C"));
    }

    #[test]
    fn reverse_query() {
        let found = rows(None, Some("tmr")).unwrap();
        let modules: Vec<_> = found.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(modules, ["TMR1_00687", "TMR1_02141"]);
        assert!(rows(None, Some("CAN")).is_err());
    }

    #[test]
    fn device_restricted() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../devices/pic32mz2048efm100.device.toml");
        let found = rows(Some(&path), None).unwrap();
        assert!(found.iter().any(|(m, c)| m == "TMR1" && c == "TMR"));
    }
}
