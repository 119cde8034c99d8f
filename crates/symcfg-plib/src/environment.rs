//! What a component sees of the outside world while declaring.

use symcfg_core::{ArtifactDescriptor, ArtifactKind};
use symcfg_device::DeviceMetadata;
use symcfg_targets::HostBindings;

/// Read-only device metadata and host bindings for one declaration.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub device: &'a dyn DeviceMetadata,
    pub host: &'a HostBindings,
}

impl<'a> Environment<'a> {
    pub fn new(device: &'a dyn DeviceMetadata, host: &'a HostBindings) -> Self {
        Self { device, host }
    }

    /// A generated peripheral file: `template` is resolved relative to the
    /// component's template directory, the output lands in `/<subdir>/`
    /// and in the project under `config/<configuration>/<subdir>/`.
    pub fn peripheral_file(
        &self,
        kind: ArtifactKind,
        template_dir: &str,
        template: &str,
        output: &str,
        subdir: &str,
    ) -> ArtifactDescriptor {
        let subdir = subdir.trim_matches('/');
        ArtifactDescriptor::new(kind, format!("{template_dir}/{template}"), output)
            .with_location(format!("/{subdir}/"), self.host.config_path(subdir))
    }
}

/// An entry appended to one of the core's shared string lists
/// (`LIST_SYSTEM_DEFINITIONS_H_INCLUDES`, ...).
pub fn list_entry(template: impl Into<String>, list: &str) -> ArtifactDescriptor {
    ArtifactDescriptor::new(ArtifactKind::StringList, template, list)
        .with_location(format!("core.{list}"), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use symcfg_device::{DeviceTree, Node, ROOT_TAG};
    use symcfg_targets::Processor;

    #[test]
    fn peripheral_file_locations() {
        let device = DeviceTree::new(Node::new(ROOT_TAG));
        let host = HostBindings::new(Processor::atsame70q21b())
            .unwrap()
            .with_configuration("sam_e70_xult");
        let env = Environment::new(&device, &host);
        let file = env.peripheral_file(
            ArtifactKind::Header,
            "../peripheral/sdramc_6100/templates",
            "plib_sdramc.h.ftl",
            "plib_sdramc0.h",
            "peripheral/sdramc",
        );
        assert_eq!(file.template, "../peripheral/sdramc_6100/templates/plib_sdramc.h.ftl");
        assert_eq!(file.destination, "/peripheral/sdramc/");
        assert_eq!(file.project_path, "config/sam_e70_xult/peripheral/sdramc/");
    }

    #[test]
    fn list_entries_target_core_lists() {
        let entry = list_entry(
            "../peripheral/rstc_U2239/templates/system/definitions.h.ftl",
            "LIST_SYSTEM_DEFINITIONS_H_INCLUDES",
        );
        assert_eq!(entry.kind, ArtifactKind::StringList);
        assert_eq!(entry.destination, "core.LIST_SYSTEM_DEFINITIONS_H_INCLUDES");
        assert_eq!(entry.output_name, "LIST_SYSTEM_DEFINITIONS_H_INCLUDES");
    }
}
