//! Status synchronization: match a resource against one inventory snapshot
//! and build its status record.

use super::InventoryResource;
use crate::error::ControllerError;
use crate::status::StatusRecord;
use vsphere_client::{network, InventoryObjectSet, ManagedObjectReference, VSphereClientTrait, VSphereError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Matched {
        object: ManagedObjectReference,
        record: StatusRecord,
    },
    NoMatch,
}

/// Finds the first object named exactly like the resource's target and maps it.
///
/// Any extraction or resolution failure aborts the whole sync; no partial
/// record is returned. Network references are resolved live, so the record
/// may combine the snapshot's direct fields with newer network state.
pub async fn sync<K: InventoryResource>(
    client: &dyn VSphereClientTrait,
    resource: &K,
    objects: &InventoryObjectSet,
) -> Result<SyncOutcome, ControllerError> {
    let target = resource.target_name();
    let Some(object) = objects.iter().find(|o| o.name == target) else {
        return Ok(SyncOutcome::NoMatch);
    };

    let mut record = StatusRecord::new();
    K::map_status(object, &mut record)?;

    for reference in K::network_references(object)? {
        let binding = network::resolve(client, &reference).await.map_err(|e| match e {
            VSphereError::MissingProperty { object, path } => {
                ControllerError::field(&object, &path, "missing or malformed")
            }
            other => ControllerError::VSphere(other),
        })?;
        K::apply_binding(&mut record, &binding);
    }

    Ok(SyncOutcome::Matched {
        object: object.reference.clone(),
        record,
    })
}
