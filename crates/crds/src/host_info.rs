//! HostInfo CRD
//!
//! Mirrors an ESXi host's runtime summary into status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "topology.vkubeviewer.com",
    version = "v1",
    kind = "HostInfo",
    namespaced,
    status = "HostInfoStatus",
    printcolumn = r#"{"name":"Host","type":"string","jsonPath":".spec.hostname"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.hostConnectionState"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HostInfoSpec {
    /// ESXi host name as shown in vCenter
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostInfoStatus {
    /// Product full name, e.g. "VMware ESXi 8.0.1 build-21495797"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_connection_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_power_state: Option<String>,

    /// "true" or "false"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_maintenance_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_overall_status: Option<String>,

    /// Total CPU capacity (MHz)
    #[serde(rename = "totalCPU", default, skip_serializing_if = "Option::is_none")]
    pub total_cpu: Option<i64>,

    /// Unused CPU capacity (MHz)
    #[serde(rename = "freeCPU", default, skip_serializing_if = "Option::is_none")]
    pub free_cpu: Option<i64>,

    /// Physical memory (MB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_memory: Option<i64>,

    /// Unused memory (MB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_memory: Option<i64>,
}
