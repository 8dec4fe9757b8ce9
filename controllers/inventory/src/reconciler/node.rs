//! NodeInfo <- VirtualMachine

use super::extract::Fields;
use super::InventoryResource;
use crate::error::ControllerError;
use crate::status::StatusRecord;
use crds::NodeInfo;
use vsphere_client::{InventoryKind, InventoryObject, ManagedObjectReference, NetworkBinding};

impl InventoryResource for NodeInfo {
    const INVENTORY_KIND: InventoryKind = InventoryKind::VirtualMachine;

    const STATUS_FIELDS: &'static [&'static str] = &[
        "vmGuestId",
        "vmTotalCPU",
        "vmResvdCPU",
        "vmTotalMem",
        "vmResvdMem",
        "vmPowerState",
        "vmHwVersion",
        "vmIpAddress",
        "pathToVM",
        "switchType",
        "netName",
        "netOverallStatus",
        "vlanId",
    ];

    fn target_name(&self) -> &str {
        &self.spec.nodename
    }

    fn map_status(object: &InventoryObject, record: &mut StatusRecord) -> Result<(), ControllerError> {
        let f = Fields::of(object);

        record.set_opt("vmGuestId", f.optional_str("summary.guest.guestId")?);
        record.set("vmTotalCPU", f.required_i64("summary.config.numCpu")?);
        record.set_opt("vmResvdCPU", f.optional_i64("summary.config.cpuReservation")?);
        record.set("vmTotalMem", f.required_i64("summary.config.memorySizeMB")?);
        record.set_opt("vmResvdMem", f.optional_i64("summary.config.memoryReservation")?);
        record.set("vmPowerState", f.required_str("summary.runtime.powerState")?);
        record.set_opt("vmHwVersion", f.optional_str("summary.guest.hwVersion")?);
        record.set_opt("vmIpAddress", f.optional_str("summary.guest.ipAddress")?);
        record.set_opt("pathToVM", f.optional_str("summary.config.vmPathName")?);
        Ok(())
    }

    fn network_references(object: &InventoryObject) -> Result<Vec<ManagedObjectReference>, ControllerError> {
        match object.properties.lookup("network") {
            None => Ok(Vec::new()),
            Some(refs) => serde_json::from_value(refs.clone())
                .map_err(|e| ControllerError::field(&object.name, "network", e.to_string())),
        }
    }

    fn apply_binding(record: &mut StatusRecord, binding: &NetworkBinding) {
        record.set("switchType", binding.switch_type());
        record.set("netName", binding.name());
        record.set("netOverallStatus", binding.overall_status());
        // A standard binding after a distributed one drops the VLAN
        record.set_opt("vlanId", binding.vlan_id());
    }
}
