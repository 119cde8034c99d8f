//! Enumerated options derived from value-group metadata.

use symcfg_core::EnumOption;
use symcfg_device::{parse_literal, Node};

use crate::error::{BitfieldError, Result};

/// Which attribute of a `value` node becomes the option key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySource {
    /// The short value name (`ROW11`).
    #[default]
    Name,
    /// The human caption (`1:256 prescale value`).
    Caption,
}

/// Build the ordered option list of a value group.
///
/// Entries captioned "reserved" (any case) are dropped. Values may be given
/// in hexadecimal (`0x` prefix) or decimal.
pub fn derive_enum_options(group: &Node, keys: KeySource) -> Result<Vec<EnumOption>> {
    group
        .children()
        .iter()
        .filter(|v| v.tag() == "value")
        .filter(|v| !v.attribute("caption").unwrap_or_default().eq_ignore_ascii_case("reserved"))
        .map(|v| {
            let raw = v.attribute("value").unwrap_or_default();
            let value = parse_literal(raw).ok_or_else(|| BitfieldError::BadLiteral {
                name: v.name().to_string(),
                value: raw.to_string(),
            })?;
            let caption = v.attribute("caption").unwrap_or_default();
            let key = match keys {
                KeySource::Name => v.name(),
                KeySource::Caption => caption,
            };
            Ok(EnumOption::new(key, value, caption))
        })
        .collect()
}
