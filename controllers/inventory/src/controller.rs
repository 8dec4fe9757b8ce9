//! Main controller implementation.
//!
//! Establishes the vCenter session, builds the shared [`Reconciler`] and
//! runs one watcher per inventory-mirroring kind until any of them stops.

use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::status::KubeStatusStore;
use crate::watcher::Watcher;
use crds::{DatastoreInfo, FCDInfo, HostInfo, NodeInfo};
use kube::{Api, Client};
use kube::Resource;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vsphere_client::{Endpoint, VSphereClient, VSphereClientTrait};

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()> + DeserializeOwned,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn watch_error(kind: &str, result: Result<Result<(), ControllerError>, tokio::task::JoinError>) -> ControllerError {
    match result {
        Err(e) => ControllerError::Watch(format!("{} watcher panicked: {}", kind, e)),
        Ok(Err(e)) => ControllerError::Watch(format!("{} watcher error: {}", kind, e)),
        Ok(Ok(())) => ControllerError::Watch(format!("{} watcher stopped", kind)),
    }
}

/// Top-level controller for inventory-mirroring resources.
pub struct Controller {
    node_info_watcher: JoinHandle<Result<(), ControllerError>>,
    host_info_watcher: JoinHandle<Result<(), ControllerError>>,
    datastore_info_watcher: JoinHandle<Result<(), ControllerError>>,
    fcd_info_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// Failing to establish the vCenter session is fatal: no watcher is
    /// started without an authenticated session.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Inventory Controller");

        let endpoint = Endpoint::parse(&config.vsphere_url)?;
        let vsphere = VSphereClient::establish(&endpoint, &config.credentials, &config.session_options())
            .await
            .map_err(|e| {
                error!("Failed to establish a vCenter session: {}", e);
                error!("Please ensure:");
                error!("  1. GOVMOMI_USERNAME and GOVMOMI_PASSWORD are set correctly");
                error!("  2. vCenter is reachable at {}", endpoint);
                e
            })?;
        info!("vCenter session established with {}", endpoint);
        let vsphere: Arc<dyn VSphereClientTrait> = Arc::new(vsphere);

        let kube_client = Client::try_default().await?;

        let namespace = config.namespace.as_deref();
        let node_info_api: Api<NodeInfo> = scoped_api(&kube_client, namespace);
        let host_info_api: Api<HostInfo> = scoped_api(&kube_client, namespace);
        let datastore_info_api: Api<DatastoreInfo> = scoped_api(&kube_client, namespace);
        let fcd_info_api: Api<FCDInfo> = scoped_api(&kube_client, namespace);

        let reconciler = Arc::new(Reconciler::new(
            vsphere,
            Arc::new(KubeStatusStore::new(kube_client)),
            config.requeue_interval,
            config.reconcile_timeout,
        ));

        let watcher_instance = Arc::new(Watcher::new(
            reconciler,
            node_info_api,
            host_info_api,
            datastore_info_api,
            fcd_info_api,
        ));

        let node_info_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_node_infos().await })
        };
        let host_info_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_host_infos().await })
        };
        let datastore_info_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_datastore_infos().await })
        };
        let fcd_info_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_fcd_infos().await })
        };

        Ok(Self {
            node_info_watcher,
            host_info_watcher,
            datastore_info_watcher,
            fcd_info_watcher,
        })
    }

    /// Runs the controller until a watcher exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Inventory Controller running");

        // Watchers run forever; any exit is an error
        let err = tokio::select! {
            result = &mut self.node_info_watcher => watch_error("NodeInfo", result),
            result = &mut self.host_info_watcher => watch_error("HostInfo", result),
            result = &mut self.datastore_info_watcher => watch_error("DatastoreInfo", result),
            result = &mut self.fcd_info_watcher => watch_error("FCDInfo", result),
        };
        error!("{}", err);
        Err(err)
    }
}
