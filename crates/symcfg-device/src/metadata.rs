//! The read-only device metadata provider.
//!
//! Components query the device through [`DeviceMetadata`]: raw
//! selector-addressed access to nodes and attributes, plus typed queries
//! for the parts of the description the peripheral libraries consume
//! (parameters, interrupts, modules, registers, bitfields, value groups).

use crate::error::{DeviceError, Result};
use crate::node::{parse_literal, Node};
use crate::selector::Selector;

/// Tag of the root node of every device description.
pub const ROOT_TAG: &str = "avr-tools-device-file";

/// An interrupt vector of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupt {
    /// Vector index. System exceptions of Cortex-M parts are negative.
    pub index: i32,
    pub name: String,
    pub caption: String,
    /// Name used in generated headers when it differs from `name`.
    pub alternate_name: Option<String>,
    pub alternate_caption: Option<String>,
    /// Peripheral instance raising the interrupt (e.g. `TIMER_1`).
    pub module_instance: Option<String>,
}

impl Interrupt {
    /// Name used for symbols and handlers.
    pub fn header_name(&self) -> &str {
        self.alternate_name.as_deref().unwrap_or(&self.name)
    }

    pub fn header_caption(&self) -> &str {
        self.alternate_caption.as_deref().unwrap_or(&self.caption)
    }

    fn from_node(node: &Node) -> Result<Self> {
        let selector = format!(
            "/{ROOT_TAG}/devices/device/interrupts/interrupt@[name=\"{}\"]",
            node.name()
        );
        let index = node
            .attribute("index")
            .ok_or_else(|| DeviceError::MissingAttribute {
                selector: selector.clone(),
                attribute: "index".into(),
            })?
            .parse()
            .map_err(|_| DeviceError::Malformed {
                selector: selector.clone(),
                detail: "interrupt index is not an integer".into(),
            })?;
        Ok(Self {
            index,
            name: node.name().to_string(),
            caption: node.attribute("caption").unwrap_or_default().to_string(),
            alternate_name: node.attribute("header:alternate-name").map(str::to_string),
            alternate_caption: node.attribute("header:alternate-caption").map(str::to_string),
            module_instance: node.attribute("module-instance").map(str::to_string),
        })
    }
}

/// Selector-addressed, read-only access to a device description.
pub trait DeviceMetadata {
    /// Root node of the description.
    fn root(&self) -> &Node;

    /// Resolve a selector, returning `None` when nothing matches.
    fn find(&self, selector: &str) -> Result<Option<&Node>> {
        Ok(Selector::parse(selector)?.resolve(self.root()))
    }

    /// Resolve a selector that must match.
    fn node(&self, selector: &str) -> Result<&Node> {
        self.find(selector)?
            .ok_or_else(|| DeviceError::MissingNode(selector.to_string()))
    }

    fn attribute(&self, selector: &str, name: &str) -> Result<&str> {
        self.node(selector)?
            .attribute(name)
            .ok_or_else(|| DeviceError::MissingAttribute {
                selector: selector.to_string(),
                attribute: name.to_string(),
            })
    }

    fn children(&self, selector: &str) -> Result<&[Node]> {
        Ok(self.node(selector)?.children())
    }

    /// Attribute of the `device` node (`name`, `family`, `architecture`, ...).
    fn device_attribute(&self, name: &str) -> Result<&str> {
        self.attribute(&format!("/{ROOT_TAG}/devices/device"), name)
    }

    /// Value of a named device parameter, if declared.
    fn parameter(&self, name: &str) -> Result<Option<&str>> {
        let selector = format!("/{ROOT_TAG}/devices/device/parameters/param@[name=\"{name}\"]");
        Ok(self.find(&selector)?.and_then(|n| n.attribute("value")))
    }

    /// Numeric device parameter.
    fn parameter_value(&self, name: &str) -> Result<Option<u64>> {
        match self.parameter(name)? {
            Some(text) => parse_literal(text).map(Some).ok_or_else(|| DeviceError::Malformed {
                selector: format!("/{ROOT_TAG}/devices/device/parameters/param@[name=\"{name}\"]"),
                detail: format!("parameter value {text:?} is not numeric"),
            }),
            None => Ok(None),
        }
    }

    /// Every interrupt vector, in description order.
    fn interrupts(&self) -> Result<Vec<Interrupt>> {
        let selector = format!("/{ROOT_TAG}/devices/device/interrupts");
        match self.find(&selector)? {
            Some(node) => node
                .children()
                .iter()
                .filter(|c| c.tag() == "interrupt")
                .map(Interrupt::from_node)
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    /// The interrupt raised by a peripheral instance.
    fn interrupt_for(&self, module_instance: &str) -> Result<Interrupt> {
        self.interrupts()?
            .into_iter()
            .find(|i| i.module_instance.as_deref() == Some(module_instance))
            .ok_or_else(|| {
                DeviceError::MissingNode(format!(
                    "/{ROOT_TAG}/devices/device/interrupts/interrupt@[module-instance=\"{module_instance}\"]"
                ))
            })
    }

    /// Every `module` node, in declaration order.
    fn modules(&self) -> Result<Vec<&Node>> {
        match self.find(&format!("/{ROOT_TAG}/modules"))? {
            Some(node) => Ok(node.children().iter().filter(|c| c.tag() == "module").collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Selector of a module node.
    fn module_selector(&self, module: &str) -> String {
        format!("/{ROOT_TAG}/modules/module@[name=\"{module}\"]")
    }

    fn module(&self, module: &str) -> Result<&Node> {
        self.node(&self.module_selector(module))
    }

    /// Hardware IP id of a module (e.g. `6100`, `U2239`).
    fn module_id(&self, module: &str) -> Result<&str> {
        self.attribute(&self.module_selector(module), "id")
    }

    /// Selector of a register in the module's register group of the same name.
    fn register_selector(&self, module: &str, register: &str) -> String {
        format!(
            "{}/register-group@[name=\"{module}\"]/register@[name=\"{register}\"]",
            self.module_selector(module)
        )
    }

    fn register(&self, module: &str, register: &str) -> Result<&Node> {
        self.node(&self.register_selector(module, register))
    }

    /// Bitfield child nodes of a register.
    fn bitfields(&self, module: &str, register: &str) -> Result<Vec<&Node>> {
        Ok(self
            .register(module, register)?
            .children()
            .iter()
            .filter(|c| c.tag() == "bitfield")
            .collect())
    }

    fn bitfield(&self, module: &str, register: &str, field: &str) -> Result<&Node> {
        self.node(&format!(
            "{}/bitfield@[name=\"{field}\"]",
            self.register_selector(module, register)
        ))
    }

    fn value_group(&self, module: &str, group: &str) -> Result<&Node> {
        self.node(&format!(
            "{}/value-group@[name=\"{group}\"]",
            self.module_selector(module)
        ))
    }
}

/// An in-memory device description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTree {
    root: Node,
}

impl DeviceTree {
    /// Wrap a root node. The root must carry the standard root tag for
    /// selectors to resolve.
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// Device name, or the empty string when the description has none.
    pub fn name(&self) -> &str {
        self.device_attribute("name").unwrap_or_default()
    }
}

impl DeviceMetadata for DeviceTree {
    fn root(&self) -> &Node {
        &self.root
    }
}
