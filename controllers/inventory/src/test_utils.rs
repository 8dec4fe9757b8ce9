//! Test utilities for unit testing reconcilers
//!
//! Builders for declared resources and inventory fixtures, plus an
//! in-memory status store that records every commit.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::status::{StatusStore, StatusTarget};
use crds::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vsphere_client::{InventoryObject, ManagedObjectReference, MockVSphereClient, PropertyBag};

pub const TEST_NAMESPACE: &str = "default";

pub fn node_info(name: &str, nodename: &str) -> NodeInfo {
    let mut node = NodeInfo::new(name, NodeInfoSpec { nodename: nodename.to_string() });
    node.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    node
}

pub fn host_info(name: &str, hostname: &str) -> HostInfo {
    let mut host = HostInfo::new(name, HostInfoSpec { hostname: hostname.to_string() });
    host.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    host
}

pub fn datastore_info(name: &str, datastore: &str) -> DatastoreInfo {
    let mut ds = DatastoreInfo::new(name, DatastoreInfoSpec { datastore: datastore.to_string() });
    ds.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    ds
}

pub fn fcd_info(name: &str, pv_id: &str) -> FCDInfo {
    let mut fcd = FCDInfo::new(name, FCDInfoSpec { pv_id: pv_id.to_string() });
    fcd.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    fcd
}

fn object(kind: &str, id: &str, name: &str, properties: Vec<(&str, Value)>) -> InventoryObject {
    let mut bag = PropertyBag::new();
    bag.insert("name", json!(name));
    for (path, value) in properties {
        bag.insert(path, value);
    }
    InventoryObject {
        reference: ManagedObjectReference::new(kind, id),
        name: name.to_string(),
        properties: bag,
    }
}

pub fn vm_object(name: &str, summary: Value, network: Value) -> InventoryObject {
    object("VirtualMachine", "vm-1", name, vec![("summary", summary), ("network", network)])
}

pub fn host_object(name: &str, summary: Value) -> InventoryObject {
    object("HostSystem", "host-1", name, vec![("summary", summary)])
}

pub fn datastore_object(name: &str, summary: Value, overall_status: Option<&str>, hosts: Value) -> InventoryObject {
    let mut properties = vec![("summary", summary), ("host", hosts)];
    if let Some(status) = overall_status {
        properties.push(("overallStatus", json!(status)));
    }
    object("Datastore", "datastore-1", name, properties)
}

pub fn disk_object(config: Value, datastore_name: &str) -> InventoryObject {
    let id = config["id"]["id"].as_str().unwrap_or("fcd").to_string();
    let name = config["name"].as_str().unwrap_or("disk").to_string();
    object(
        "VStorageObject",
        &id,
        &name,
        vec![("config", config), ("datastoreName", json!(datastore_name))],
    )
}

/// Decodes a property collector `ObjectContent` as it arrives on the wire
pub fn wire_object(content: Value) -> InventoryObject {
    InventoryObject::from_content(serde_json::from_value(content).unwrap()).unwrap()
}

/// Asserts that a fully populated status serializes to exactly `fields`
pub fn assert_status_keys<S: Serialize>(status: &S, fields: &[&str]) {
    let serialized = serde_json::to_value(status).unwrap();
    let keys: BTreeSet<&str> = serialized
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    let expected: BTreeSet<&str> = fields.iter().copied().collect();
    assert_eq!(keys, expected);
    assert_eq!(fields.len(), expected.len(), "duplicate status field");
}

/// VM summary with the fields the NodeInfo mapping requires
pub fn vm_summary(cpu: i64, mem_mb: i64, power: &str) -> Value {
    json!({
        "config": {"numCpu": cpu, "memorySizeMB": mem_mb},
        "runtime": {"powerState": power},
    })
}

/// Registers a VM on the mock inventory
pub fn add_vm(mock: &MockVSphereClient, id: &str, name: &str, summary: Value, networks: &[ManagedObjectReference]) {
    let networks: Vec<Value> = networks.iter().map(ManagedObjectReference::to_wire).collect();
    mock.add_object(
        ManagedObjectReference::new("VirtualMachine", id),
        [("name", json!(name)), ("summary", summary), ("network", json!(networks))],
    );
}

pub fn add_standard_network(mock: &MockVSphereClient, id: &str, name: &str, status: &str) -> ManagedObjectReference {
    let reference = ManagedObjectReference::new("Network", id);
    mock.set_properties(
        reference.clone(),
        [("name", json!(name)), ("overallStatus", json!(status))],
    );
    reference
}

pub fn add_distributed_network(
    mock: &MockVSphereClient,
    id: &str,
    name: &str,
    status: &str,
    vlan: Value,
) -> ManagedObjectReference {
    let reference = ManagedObjectReference::new("DistributedVirtualPortgroup", id);
    mock.set_properties(
        reference.clone(),
        [
            ("name", json!(name)),
            ("overallStatus", json!(status)),
            (
                "config",
                json!({"name": name, "defaultPortConfig": {"_typeName": "VMwareDVSPortSetting", "vlan": vlan}}),
            ),
        ],
    );
    reference
}

pub fn single_vlan(id: u32) -> Value {
    json!({"_typeName": "VmwareDistributedVirtualSwitchVlanIdSpec", "inherited": false, "vlanId": id})
}

pub fn trunk_vlan(start: u32, end: u32) -> Value {
    json!({
        "_typeName": "VmwareDistributedVirtualSwitchTrunkVlanSpec",
        "inherited": false,
        "vlanId": [{"_typeName": "NumericRange", "start": start, "end": end}]
    })
}

/// Status store that keeps every committed patch in memory
#[derive(Default)]
pub struct RecordingStore {
    commits: Mutex<Vec<(String, Value)>>,
    failure: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed patches as (`namespace/name`, patch), oldest first
    pub fn commits(&self) -> Vec<(String, Value)> {
        self.commits.lock().unwrap().clone()
    }

    /// Latest `status` object committed for `name`
    pub fn last_status(&self, name: &str) -> Option<Value> {
        let key = format!("{}/{}", TEST_NAMESPACE, name);
        self.commits
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, patch)| patch["status"].clone())
    }

    pub fn fail_commits(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait::async_trait]
impl StatusStore for RecordingStore {
    async fn commit(&self, target: &StatusTarget, patch: &Value) -> Result<(), ControllerError> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ControllerError::Watch(message));
        }
        self.commits
            .lock()
            .unwrap()
            .push((format!("{}/{}", target.namespace, target.name), patch.clone()));
        Ok(())
    }
}

pub fn reconciler(mock: &Arc<MockVSphereClient>, store: &Arc<RecordingStore>) -> Reconciler {
    reconciler_with_timeout(mock, store, Duration::from_secs(120))
}

pub fn reconciler_with_timeout(
    mock: &Arc<MockVSphereClient>,
    store: &Arc<RecordingStore>,
    timeout: Duration,
) -> Reconciler {
    Reconciler::new(mock.clone(), store.clone(), Duration::from_secs(60), timeout)
}
