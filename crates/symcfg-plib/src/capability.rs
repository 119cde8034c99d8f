//! Which peripheral IP provides which capability.
//!
//! Modules are keyed `<NAME>_<ID>` the way device descriptions identify
//! them (`SERCOM_U2201`, `TMR1_00687`).

use std::fmt;

use serde::Serialize;
use symcfg_device::DeviceMetadata;

/// A service a peripheral can offer to middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Capability {
    Memory,
    Uart,
    Spi,
    I2c,
    Sqi,
    Tmr,
    Lcdc,
    Sdhc,
    Pmp,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::Memory,
        Capability::Uart,
        Capability::Spi,
        Capability::I2c,
        Capability::Sqi,
        Capability::Tmr,
        Capability::Lcdc,
        Capability::Sdhc,
        Capability::Pmp,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Capability::Memory => "MEMORY",
            Capability::Uart => "UART",
            Capability::Spi => "SPI",
            Capability::I2c => "I2C",
            Capability::Sqi => "SQI",
            Capability::Tmr => "TMR",
            Capability::Lcdc => "LCDC",
            Capability::Sdhc => "SDHC",
            Capability::Pmp => "PMP",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

use Capability::*;

const SERIAL: &[Capability] = &[Uart, Spi, I2c];

static TABLE: &[(&str, &[Capability])] = &[
    ("EFC_6450", &[Memory]),
    ("NVMCTRL_U2409", &[Memory]),
    ("NVMCTRL_U2207", &[Memory]),
    ("NVMCTRL_U2802", &[Memory]),
    ("FLEXCOM_11268", SERIAL),
    ("FLEXCOM_11277", SERIAL),
    ("SERCOM_U2201", SERIAL),
    ("SPI_6088", &[Spi]),
    ("TWI_6212", &[I2c]),
    ("TWI_11280", &[I2c]),
    ("TWIHS_11210", &[I2c]),
    ("I2C_01441", &[I2c]),
    ("I2C_00774", &[I2c]),
    ("UART_02478", &[Uart]),
    ("UART_6418", &[Uart]),
    ("USART_6089", &[Uart]),
    ("USART_11278", &[Uart]),
    ("QSPI_U2008", &[Sqi]),
    ("QSPI_11171", &[Sqi]),
    ("SQI_00206", &[Sqi]),
    ("TC_U2212", &[Tmr]),
    ("TC_U2249", &[Tmr]),
    ("TC_6082", &[Tmr]),
    ("TC_44162", &[Tmr]),
    ("PIT_6079", &[Tmr]),
    ("RTT_6081", &[Tmr]),
    ("RTC_U2250", &[Tmr]),
    ("RTC_U2202", &[Tmr]),
    ("TMR_02815", &[Tmr]),
    ("TMR_00745", &[Tmr]),
    ("LCDC_11062", &[Lcdc]),
    ("SPI_01329", &[Spi]),
    ("SPI_00753", &[Spi]),
    ("UART_00734", &[Uart]),
    ("NVM_02819", &[Memory]),
    ("NVM_01390", &[Memory]),
    ("NVM_02629", &[Memory]),
    ("NVM_00761", &[Memory]),
    ("HEFC_44123", &[Memory]),
    ("SDMMC_44002", &[Sdhc]),
    ("SDHC_U2011", &[Sdhc]),
    ("HSMCI_6449", &[Sdhc]),
    ("SDHC_00187", &[Sdhc]),
    ("DBGU_6059", &[Uart]),
    ("PMP_00751", &[Pmp]),
    ("TMR1_00687", &[Tmr]),
    ("TMR1_02141", &[Tmr]),
];

/// Every known module key with its capabilities.
pub fn table() -> impl Iterator<Item = (&'static str, &'static [Capability])> {
    TABLE.iter().copied()
}

/// Capabilities of a module key; empty for unknown modules.
pub fn capabilities(module_key: &str) -> &'static [Capability] {
    TABLE
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(module_key))
        .map(|(_, caps)| *caps)
        .unwrap_or(&[])
}

/// Module keys offering `capability`, in table order.
pub fn modules_with(capability: Capability) -> Vec<&'static str> {
    TABLE
        .iter()
        .filter(|(_, caps)| caps.contains(&capability))
        .map(|(key, _)| *key)
        .collect()
}

/// Capabilities of every module instance a device declares. Modules
/// without a known capability are left out.
pub fn device_capabilities(
    device: &dyn DeviceMetadata,
) -> symcfg_device::Result<Vec<(String, &'static [Capability])>> {
    let mut found = Vec::new();
    for module in device.modules()? {
        let Some(id) = module.attribute("id") else {
            continue;
        };
        let caps = capabilities(&format!("{}_{id}", module.name()));
        if !caps.is_empty() {
            found.push((module.name().to_string(), caps));
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use symcfg_device::{DeviceTree, Node, ROOT_TAG};

    #[test]
    fn forward_lookup() {
        assert_eq!(capabilities("SERCOM_U2201"), &[Uart, Spi, I2c]);
        assert_eq!(capabilities("tmr1_00687"), &[Tmr]);
        assert!(capabilities("SDRAMC_6100").is_empty());
    }

    #[test]
    fn reverse_lookup() {
        let sqi = modules_with(Sqi);
        assert_eq!(sqi, ["QSPI_U2008", "QSPI_11171", "SQI_00206"]);
        assert!(modules_with(Pmp).contains(&"PMP_00751"));
        for cap in Capability::ALL {
            assert!(!modules_with(cap).is_empty(), "{cap} has no provider");
        }
    }

    #[test]
    fn keys_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::from_key(cap.key()), Some(cap));
        }
        assert_eq!(Capability::from_key("i2c"), Some(I2c));
        assert_eq!(Capability::from_key("CAN"), None);
    }

    #[test]
    fn device_modules_are_matched_by_name_and_id() {
        let module =
            |name: &str, id: &str| Node::new("module").with_attr("name", name).with_attr("id", id);
        let device = DeviceTree::new(
            Node::new(ROOT_TAG).with_child(
                Node::new("modules")
                    .with_child(module("TMR1", "00687"))
                    .with_child(module("SDRAMC", "6100"))
                    .with_child(module("SERCOM", "U2201")),
            ),
        );
        let found = device_capabilities(&device).unwrap();
        let names: Vec<_> = found.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["TMR1", "SERCOM"]);
        assert_eq!(found[1].1, SERIAL);
    }
}
