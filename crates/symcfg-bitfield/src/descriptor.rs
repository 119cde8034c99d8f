//! Bitfield and register descriptors built from device metadata.

use symcfg_core::EnumOption;
use symcfg_device::{parse_literal, DeviceError, DeviceMetadata, Node};

use crate::codec::{encode_register, Field};
use crate::error::{BitfieldError, Result};
use crate::options::{derive_enum_options, KeySource};

/// A fixed-offset, fixed-width sub-range of a register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldDescriptor {
    pub register: String,
    pub name: String,
    pub caption: String,
    pub offset: u32,
    pub width: u32,
    /// Enumerated settings, empty for plain numeric fields.
    pub options: Vec<EnumOption>,
}

/// Offset and width of a contiguous mask.
pub fn mask_span(mask: u64) -> Option<(u32, u32)> {
    if mask == 0 {
        return None;
    }
    let offset = mask.trailing_zeros();
    let run = mask >> offset;
    let width = run.trailing_ones();
    if width < 64 && run >> width != 0 {
        return None;
    }
    Some((offset, width))
}

impl BitfieldDescriptor {
    /// Describe `module`.`register`.`field`, attaching the options of the
    /// value group the field refers to.
    pub fn from_metadata<M: DeviceMetadata + ?Sized>(
        device: &M,
        module: &str,
        register: &str,
        field: &str,
        keys: KeySource,
    ) -> Result<Self> {
        let node = device.bitfield(module, register, field)?;
        Self::from_node(device, module, register, node, keys)
    }

    fn from_node<M: DeviceMetadata + ?Sized>(
        device: &M,
        module: &str,
        register: &str,
        node: &Node,
        keys: KeySource,
    ) -> Result<Self> {
        let name = node.name().to_string();
        let raw = node.attribute("mask").ok_or_else(|| DeviceError::MissingAttribute {
            selector: format!(
                "{}/bitfield@[name=\"{name}\"]",
                device.register_selector(module, register)
            ),
            attribute: "mask".into(),
        })?;
        let mask = parse_literal(raw).ok_or_else(|| BitfieldError::BadLiteral {
            name: name.clone(),
            value: raw.to_string(),
        })?;
        let (offset, width) = mask_span(mask).ok_or_else(|| BitfieldError::NonContiguousMask {
            field: name.clone(),
            mask,
        })?;
        let options = match node.attribute("values") {
            Some(group) => derive_enum_options(device.value_group(module, group)?, keys)?,
            None => Vec::new(),
        };
        Ok(Self {
            register: register.to_string(),
            caption: node.attribute("caption").unwrap_or_default().to_string(),
            name,
            offset,
            width,
            options,
        })
    }

    pub fn field(&self) -> Field {
        Field::span(self.offset, self.width)
    }

    /// Mask in register position.
    pub fn mask(&self) -> u64 {
        self.field().register_mask()
    }

    pub fn option(&self, key: &str) -> Option<&EnumOption> {
        self.options.iter().find(|o| o.key == key)
    }

    /// Check that `value` fits the field.
    pub fn check(&self, value: u64) -> Result<u64> {
        if value & !self.field().mask != 0 {
            return Err(BitfieldError::ValueOutOfRange {
                field: format!("{}.{}", self.register, self.name),
                value,
                width: self.width,
            });
        }
        Ok(value)
    }
}

/// All bitfields of one register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterLayout {
    pub name: String,
    pub fields: Vec<BitfieldDescriptor>,
}

impl RegisterLayout {
    pub fn from_metadata<M: DeviceMetadata + ?Sized>(
        device: &M,
        module: &str,
        register: &str,
        keys: KeySource,
    ) -> Result<Self> {
        let fields = device
            .bitfields(module, register)?
            .into_iter()
            .map(|node| BitfieldDescriptor::from_node(device, module, register, node, keys))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: register.to_string(),
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Result<&BitfieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| BitfieldError::UnknownField {
                register: self.name.clone(),
                field: name.to_string(),
            })
    }

    /// Compose a register value from named field values. Fields not named
    /// are zero.
    pub fn compose(&self, values: &[(&str, u64)]) -> Result<u64> {
        let fields = values
            .iter()
            .map(|(name, value)| {
                let field = self.field(name)?;
                Ok((field.check(*value)?, field.field()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(encode_register(&fields))
    }

    /// Split a register value into every field, in declaration order.
    pub fn decompose(&self, composed: u64) -> Vec<(&str, u64)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.field().extract(composed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symcfg_device::{DeviceTree, ROOT_TAG};

    fn cr_field(name: &str) -> Result<BitfieldDescriptor> {
        BitfieldDescriptor::from_metadata(&device(), "SDRAMC", "CR", name, KeySource::Name)
    }

    fn device() -> DeviceTree {
        let field = |name: &str, mask: &str| {
            Node::new("bitfield").with_attr("name", name).with_attr("mask", mask)
        };
        let value = |name: &str, value: &str, caption: &str| {
            Node::new("value")
                .with_attr("name", name)
                .with_attr("value", value)
                .with_attr("caption", caption)
        };
        DeviceTree::new(
            Node::new(ROOT_TAG).with_child(
                Node::new("modules").with_child(
                    Node::new("module")
                        .with_attr("name", "SDRAMC")
                        .with_attr("id", "6100")
                        .with_child(
                            Node::new("register-group").with_attr("name", "SDRAMC").with_child(
                                Node::new("register")
                                    .with_attr("name", "CR")
                                    .with_child(
                                        field("NC", "0x3").with_attr("values", "SDRAMC_CR__NC"),
                                    )
                                    .with_child(field("NR", "0xC"))
                                    .with_child(field("CAS", "0x60"))
                                    .with_child(field("GAP", "0x500")),
                            ),
                        )
                        .with_child(
                            Node::new("value-group")
                                .with_attr("name", "SDRAMC_CR__NC")
                                .with_child(value("COL8", "0x0", "8 column bits"))
                                .with_child(value("COL9", "0x1", "9 column bits")),
                        ),
                ),
            ),
        )
    }

    #[test]
    fn spans() {
        assert_eq!(mask_span(0x60), Some((5, 2)));
        assert_eq!(mask_span(0xF000_0000), Some((28, 4)));
        assert_eq!(mask_span(u64::MAX), Some((0, 64)));
        assert_eq!(mask_span(0x5), None);
        assert_eq!(mask_span(0), None);
    }

    #[test]
    fn descriptor_from_metadata() {
        let nc = cr_field("NC").unwrap();
        assert_eq!((nc.offset, nc.width), (0, 2));
        assert_eq!(nc.option("COL9").unwrap().value, 1);
        let cas = cr_field("CAS").unwrap();
        assert_eq!(cas.mask(), 0x60);
        assert!(cas.options.is_empty());
        assert!(cas.check(3).is_ok());
        assert!(matches!(cas.check(4), Err(BitfieldError::ValueOutOfRange { .. })));
    }

    #[test]
    fn non_contiguous_mask_is_rejected() {
        let err = cr_field("GAP").unwrap_err();
        assert!(matches!(err, BitfieldError::NonContiguousMask { mask: 0x500, .. }));
        assert!(RegisterLayout::from_metadata(&device(), "SDRAMC", "CR", KeySource::Name).is_err());
    }

    #[test]
    fn missing_field_is_a_metadata_error() {
        let err = cr_field("NB").unwrap_err();
        assert!(matches!(err, BitfieldError::Device(DeviceError::MissingNode(_))));
    }

    #[test]
    fn layout_compose_and_decompose() {
        let layout = RegisterLayout {
            name: "CR".into(),
            fields: vec![
                cr_field("NC").unwrap(),
                cr_field("NR").unwrap(),
                cr_field("CAS").unwrap(),
            ],
        };
        let value = layout.compose(&[("NC", 1), ("NR", 2), ("CAS", 3)]).unwrap();
        assert_eq!(value, 0x1 | 0x8 | 0x60);
        assert_eq!(layout.decompose(value), [("NC", 1), ("NR", 2), ("CAS", 3)]);
        assert!(matches!(layout.compose(&[("NB", 1)]), Err(BitfieldError::UnknownField { .. })));
        assert!(matches!(layout.compose(&[("NC", 4)]), Err(BitfieldError::ValueOutOfRange { .. })));
    }
}
