//! Reconciliation of inventory-mirroring resources.
//!
//! One [`Reconciler`] serves all four kinds. Each kind implements
//! [`InventoryResource`], which names the inventory collection it reads,
//! its status field set and its field mapping. A cycle is
//! Fetching -> Matching -> Committing and always returns to Idle; success
//! requests the next poll after a fixed interval.

mod extract;
pub mod sync;
mod node;
mod host;
mod datastore;
mod fcd;
#[cfg(test)]
mod sync_test;

use crate::backoff::BackoffTracker;
use crate::error::ControllerError;
use crate::status::{StatusRecord, StatusStore, StatusTarget};
use kube::api::ApiResource;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use sync::SyncOutcome;
use tracing::{debug, info, warn};
use vsphere_client::{
    accessor, InventoryKind, InventoryObject, ManagedObjectReference, NetworkBinding, VSphereClientTrait,
};

/// A declared resource whose status mirrors one inventory object
pub trait InventoryResource:
    Resource<DynamicType = ()> + Clone + fmt::Debug + DeserializeOwned + Send + Sync + 'static
{
    /// Inventory collection searched for the target
    const INVENTORY_KIND: InventoryKind;

    /// Wire names of every status field of the kind
    const STATUS_FIELDS: &'static [&'static str];

    /// Name of the inventory object this resource mirrors
    fn target_name(&self) -> &str;

    /// Maps the matched object's direct properties.
    fn map_status(object: &InventoryObject, record: &mut StatusRecord) -> Result<(), ControllerError>;

    /// Network references to resolve after the direct mapping.
    fn network_references(_object: &InventoryObject) -> Result<Vec<ManagedObjectReference>, ControllerError> {
        Ok(Vec::new())
    }

    /// Applies one resolved binding. Bindings are applied in reference
    /// order, so the last one wins.
    fn apply_binding(_record: &mut StatusRecord, _binding: &NetworkBinding) {}
}

/// Backoff/log key: `Kind/namespace/name`
pub fn resource_key<K: InventoryResource>(resource: &K) -> String {
    format!(
        "{}/{}/{}",
        K::kind(&()),
        resource.namespace().unwrap_or_default(),
        resource.name_any()
    )
}

pub(crate) fn status_target<K: InventoryResource>(resource: &K) -> StatusTarget {
    StatusTarget {
        kind: K::kind(&()).to_string(),
        resource: ApiResource::erase::<K>(&()),
        namespace: resource.namespace().unwrap_or_else(|| "default".to_string()),
        name: resource.name_any(),
    }
}

/// Phase of one reconciliation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Matching,
    Committing,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Fetching => "fetching inventory",
            CyclePhase::Matching => "matching",
            CyclePhase::Committing => "committing status",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Status was rewritten from the matched object
    Committed { object: ManagedObjectReference },
    /// No inventory object carries the target name; status untouched
    NoMatch,
}

/// Result of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub requeue_after: Duration,
}

/// Reconciles inventory-mirroring resources.
pub struct Reconciler {
    client: Arc<dyn VSphereClientTrait>,
    store: Arc<dyn StatusStore>,
    requeue_interval: Duration,
    reconcile_timeout: Duration,
    /// Per-resource failure tracking for the watchers' error policy
    pub(crate) backoff: BackoffTracker,
}

impl Reconciler {
    pub fn new(
        client: Arc<dyn VSphereClientTrait>,
        store: Arc<dyn StatusStore>,
        requeue_interval: Duration,
        reconcile_timeout: Duration,
    ) -> Self {
        Self {
            client,
            store,
            requeue_interval,
            reconcile_timeout,
            backoff: BackoffTracker::new(),
        }
    }

    /// Runs one cycle for `resource`, bounded by the reconcile timeout.
    ///
    /// Hitting the deadline drops the in-flight retrieval; any container
    /// view it held is destroyed in the background.
    pub async fn reconcile<K: InventoryResource>(&self, resource: &K) -> Result<CycleReport, ControllerError> {
        let target = status_target(resource);
        match tokio::time::timeout(self.reconcile_timeout, self.run_cycle(resource, &target)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} did not finish within {}s", target, self.reconcile_timeout.as_secs());
                Err(ControllerError::Timeout(format!(
                    "{} after {}s",
                    target,
                    self.reconcile_timeout.as_secs()
                )))
            }
        }
    }

    async fn run_cycle<K: InventoryResource>(
        &self,
        resource: &K,
        target: &StatusTarget,
    ) -> Result<CycleReport, ControllerError> {
        let mut phase = CyclePhase::Idle;
        let result = self.drive(resource, target, &mut phase).await;
        if let Err(e) = &result {
            warn!("{} failed while {}: {}", target, phase, e);
        }
        debug!("{}: {} -> {}", target, phase, CyclePhase::Idle);
        result
    }

    async fn drive<K: InventoryResource>(
        &self,
        resource: &K,
        target: &StatusTarget,
        phase: &mut CyclePhase,
    ) -> Result<CycleReport, ControllerError> {
        *phase = CyclePhase::Fetching;
        let objects = accessor::list_all(&self.client, K::INVENTORY_KIND).await?;

        *phase = CyclePhase::Matching;
        let outcome = sync::sync(self.client.as_ref(), resource, &objects).await?;

        let outcome = match outcome {
            SyncOutcome::NoMatch => {
                info!(
                    "No {} named '{}' in inventory; {} status left unchanged",
                    K::INVENTORY_KIND,
                    resource.target_name(),
                    target
                );
                CycleOutcome::NoMatch
            }
            SyncOutcome::Matched { object, record } => {
                *phase = CyclePhase::Committing;
                let patch = record.to_status_patch(K::STATUS_FIELDS);
                self.store.commit(target, &patch).await?;
                info!("Updated {} from {} ({} field(s) set)", target, object, record.len());
                CycleOutcome::Committed { object }
            }
        };

        Ok(CycleReport {
            outcome,
            requeue_after: self.requeue_interval,
        })
    }
}
