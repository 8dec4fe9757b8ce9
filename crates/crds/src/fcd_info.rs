//! FCDInfo CRD
//!
//! Mirrors a first-class disk (the backing of a vSphere CSI persistent
//! volume) into status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "topology.vkubeviewer.com",
    version = "v1",
    kind = "FCDInfo",
    namespaced,
    status = "FCDInfoStatus",
    printcolumn = r#"{"name":"PV","type":"string","jsonPath":".spec.pvId"}"#,
    printcolumn = r#"{"name":"Datastore","type":"string","jsonPath":".status.datastore"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct FCDInfoSpec {
    /// First-class disk name (the persistent volume name for CSI volumes)
    pub pv_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FCDInfoStatus {
    #[serde(rename = "sizeMB", default, skip_serializing_if = "Option::is_none")]
    pub size_mb: Option<i64>,

    /// Backing file path, e.g. "[vsanDatastore] fcd/abc.vmdk"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// thin, eagerZeroedThick or lazyZeroedThick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_type: Option<String>,

    /// Name of the datastore holding the disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcd_id: Option<String>,
}
