//! Inventory accessor
//!
//! Produces a point-in-time [`InventoryObjectSet`] for one kind. Every call
//! performs a fresh retrieval through a scoped container view; nothing is
//! cached between calls. Retrieval is all-or-nothing.

use crate::error::VSphereError;
use crate::models::*;
use crate::view::ContainerView;
use crate::vsphere_trait::VSphereClientTrait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Retrieves every inventory object of `kind`.
pub async fn list_all(
    client: &Arc<dyn VSphereClientTrait>,
    kind: InventoryKind,
) -> Result<InventoryObjectSet, VSphereError> {
    let objects = match kind {
        InventoryKind::FirstClassDisk => list_first_class_disks(client).await?,
        _ => list_through_view(client, kind).await?,
    };
    debug!("Retrieved {} {} object(s) from {}", objects.len(), kind, client.endpoint());
    Ok(InventoryObjectSet::new(kind, objects))
}

async fn list_through_view(
    client: &Arc<dyn VSphereClientTrait>,
    kind: InventoryKind,
) -> Result<Vec<InventoryObject>, VSphereError> {
    let view = ContainerView::create(client.clone(), kind.managed_type()).await?;

    let retrieved = client
        .retrieve_view_contents(view.reference(), kind.managed_type(), kind.property_paths())
        .await
        .and_then(|contents| {
            contents
                .into_iter()
                .map(InventoryObject::from_content)
                .collect::<Result<Vec<_>, _>>()
        });

    let view_ref = view.reference().clone();
    let released = view.release().await;
    let objects = retrieved?;
    if let Err(e) = released {
        warn!("Failed to destroy container view {}: {}", view_ref, e);
    }
    Ok(objects)
}

/// Disks are not managed entities: walk datastores, then ask the vStorage
/// object manager for the disks on each.
async fn list_first_class_disks(client: &Arc<dyn VSphereClientTrait>) -> Result<Vec<InventoryObject>, VSphereError> {
    let datastores = list_through_view(client, InventoryKind::FirstClassDisk).await?;

    let mut disks = Vec::new();
    for datastore in &datastores {
        let ids = client.list_storage_objects(&datastore.reference).await?;
        debug!("Datastore {} holds {} first-class disk(s)", datastore.name, ids.len());
        for id in ids {
            let raw = client.retrieve_storage_object(&id, &datastore.reference).await?;
            disks.push(InventoryObject::from_storage_object(raw, datastore)?);
        }
    }
    Ok(disks)
}
