//! DatastoreInfo <- Datastore

use super::extract::Fields;
use super::InventoryResource;
use crate::error::ControllerError;
use crate::status::StatusRecord;
use crds::DatastoreInfo;
use vsphere_client::{InventoryKind, InventoryObject};

const BYTES_PER_GB: i64 = 1024 * 1024 * 1024;

impl InventoryResource for DatastoreInfo {
    const INVENTORY_KIND: InventoryKind = InventoryKind::Datastore;

    const STATUS_FIELDS: &'static [&'static str] =
        &["type", "status", "capacity", "freeSpace", "accessible", "url", "hostsMounted"];

    fn target_name(&self) -> &str {
        &self.spec.datastore
    }

    fn map_status(object: &InventoryObject, record: &mut StatusRecord) -> Result<(), ControllerError> {
        let f = Fields::of(object);

        record.set("type", f.required_str("summary.type")?);
        record.set_opt("status", f.optional_str("overallStatus")?);
        record.set("capacity", f.required_i64("summary.capacity")? / BYTES_PER_GB);
        record.set("freeSpace", f.required_i64("summary.freeSpace")? / BYTES_PER_GB);
        record.set("accessible", f.required_bool("summary.accessible")?);
        record.set_opt("url", f.optional_str("summary.url")?);
        record.set("hostsMounted", i64::try_from(f.array_len("host")?).unwrap_or(i64::MAX));
        Ok(())
    }
}
