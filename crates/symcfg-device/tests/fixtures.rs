//! The bundled device descriptions load, validate and answer the queries
//! the peripheral libraries rely on.

use std::path::{Path, PathBuf};

use symcfg_device::{
    discover_devices, load_device_toml, validate_device, DeviceMetadata, DeviceTree,
};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn device(name: &str) -> DeviceTree {
    let path = workspace_root().join("devices").join(format!("{name}.device.toml"));
    load_device_toml(&path).unwrap().to_tree()
}

#[test]
fn every_bundled_device_validates() {
    let devices = discover_devices(&workspace_root()).unwrap();
    let names: Vec<_> = devices.iter().map(|d| d.0.as_str()).collect();
    assert_eq!(
        names,
        ["atsama5d27", "atsame70q21b", "atsamc21n18a", "pic32mz2048efm100"]
    );
    for (name, path) in &devices {
        let description = load_device_toml(path).unwrap();
        if let Err(issues) = validate_device(&description) {
            panic!("{name}: {:?}", issues.iter().map(|i| &i.message).collect::<Vec<_>>());
        }
    }
}

#[test]
fn rcause_children_are_counted_by_selector() {
    let dev = device("atsamc21n18a");
    let module = dev.attribute(r#"/avr-tools-device-file/modules/module@[name="RSTC"]"#, "id").unwrap();
    assert_eq!(module, "U2239");
    let causes = dev
        .children(r#"/avr-tools-device-file/modules/module@[name="RSTC"]/register-group@[name="RSTC"]/register@[name="RCAUSE"]"#)
        .unwrap();
    assert_eq!(causes.len(), 6);
}

#[test]
fn timer_interrupt_is_found_by_module_instance() {
    let dev = device("pic32mz2048efm100");
    let irq = dev.interrupt_for("TIMER_1").unwrap();
    assert_eq!(irq.index, 4);
    assert_eq!(dev.module_id("TMR1").unwrap(), "00687");
}

#[test]
fn nvic_priority_bits_parameter() {
    let dev = device("atsame70q21b");
    assert_eq!(dev.parameter_value("__NVIC_PRIO_BITS").unwrap(), Some(3));
    let tc0 = dev.interrupt_for("TC0").unwrap();
    assert_eq!(tc0.header_name(), "TC0_CH0");
    assert_eq!(dev.value_group("SDRAMC", "SDRAMC_CR__NR").unwrap().children().len(), 3);
}
