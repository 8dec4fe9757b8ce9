//! FCDInfo <- VStorageObject

use super::extract::Fields;
use super::InventoryResource;
use crate::error::ControllerError;
use crate::status::StatusRecord;
use crds::FCDInfo;
use vsphere_client::{InventoryKind, InventoryObject};

impl InventoryResource for FCDInfo {
    const INVENTORY_KIND: InventoryKind = InventoryKind::FirstClassDisk;

    const STATUS_FIELDS: &'static [&'static str] = &["sizeMB", "filePath", "provisioningType", "datastore", "fcdId"];

    fn target_name(&self) -> &str {
        &self.spec.pv_id
    }

    fn map_status(object: &InventoryObject, record: &mut StatusRecord) -> Result<(), ControllerError> {
        let f = Fields::of(object);

        record.set("sizeMB", f.required_i64("config.capacityInMB")?);
        record.set_opt("filePath", f.optional_str("config.backing.filePath")?);
        record.set_opt("provisioningType", f.optional_str("config.backing.provisioningType")?);
        record.set("datastore", f.required_str("datastoreName")?);
        record.set("fcdId", f.required_str("config.id.id")?);
        Ok(())
    }
}
