//! Kubernetes resource watchers.
//!
//! Each inventory-mirroring kind gets its own `kube_runtime::Controller`.
//! The controller delivers declared resources; every successful cycle asks
//! to be requeued after the poll interval, so status keeps tracking the
//! inventory even when nothing changes on the Kubernetes side.

use crate::error::ControllerError;
use crate::reconciler::{resource_key, InventoryResource, Reconciler};
use crds::{DatastoreInfo, FCDInfo, HostInfo, NodeInfo};
use futures::StreamExt;
use kube::Api;
use kube_runtime::{controller::{Action, Config as ControllerConfig}, watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Requeue decision for a failed cycle: Fibonacci backoff per resource.
fn error_policy<K: InventoryResource>(obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>) -> Action {
    let key = resource_key(obj.as_ref());
    let (delay, attempts) = ctx.backoff.record_failure(&key);
    error!(
        "Reconciliation error for {} (attempt {}): {}; retrying in {}s",
        key,
        attempts,
        error,
        delay.as_secs()
    );
    Action::requeue(delay)
}

async fn reconcile<K: InventoryResource>(obj: Arc<K>, ctx: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let key = resource_key(obj.as_ref());
    debug!("Reconciling {}", key);

    let report = ctx.reconcile(obj.as_ref()).await?;
    ctx.backoff.reset(&key);
    Ok(Action::requeue(report.requeue_after))
}

/// Runs a controller for one kind until its watch stream ends.
async fn watch_resource<K: InventoryResource>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    resource_name: &'static str,
) -> Result<(), ControllerError> {
    info!("Starting {} watcher", resource_name);

    // Debounce batches bursts of events; at most 3 cycles per kind run at once
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile::<K>, error_policy::<K>, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("{} {} reconciled", resource_name, obj.name),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    Ok(())
}

/// Watches the four inventory-mirroring kinds.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    node_info_api: Api<NodeInfo>,
    host_info_api: Api<HostInfo>,
    datastore_info_api: Api<DatastoreInfo>,
    fcd_info_api: Api<FCDInfo>,
}

impl Watcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        node_info_api: Api<NodeInfo>,
        host_info_api: Api<HostInfo>,
        datastore_info_api: Api<DatastoreInfo>,
        fcd_info_api: Api<FCDInfo>,
    ) -> Self {
        Self {
            reconciler,
            node_info_api,
            host_info_api,
            datastore_info_api,
            fcd_info_api,
        }
    }

    pub async fn watch_node_infos(&self) -> Result<(), ControllerError> {
        watch_resource(self.node_info_api.clone(), self.reconciler.clone(), "NodeInfo").await
    }

    pub async fn watch_host_infos(&self) -> Result<(), ControllerError> {
        watch_resource(self.host_info_api.clone(), self.reconciler.clone(), "HostInfo").await
    }

    pub async fn watch_datastore_infos(&self) -> Result<(), ControllerError> {
        watch_resource(self.datastore_info_api.clone(), self.reconciler.clone(), "DatastoreInfo").await
    }

    pub async fn watch_fcd_infos(&self) -> Result<(), ControllerError> {
        watch_resource(self.fcd_info_api.clone(), self.reconciler.clone(), "FCDInfo").await
    }
}
