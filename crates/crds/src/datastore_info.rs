//! DatastoreInfo CRD

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "topology.vkubeviewer.com",
    version = "v1",
    kind = "DatastoreInfo",
    namespaced,
    status = "DatastoreInfoStatus",
    printcolumn = r#"{"name":"Datastore","type":"string","jsonPath":".spec.datastore"}"#,
    printcolumn = r#"{"name":"Free (GB)","type":"integer","jsonPath":".status.freeSpace"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatastoreInfoSpec {
    /// Datastore name
    pub datastore: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatastoreInfoStatus {
    /// Filesystem type (VMFS, NFS, vsan, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ds_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Capacity (GB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,

    /// Free space (GB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_space: Option<i64>,

    /// "true" or "false"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Number of hosts mounting the datastore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_mounted: Option<i64>,
}
