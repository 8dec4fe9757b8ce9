//! NodeInfo CRD
//!
//! Mirrors a vSphere virtual machine (typically a Kubernetes node VM) into
//! status: sizing, power state, guest identity and its network binding.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "topology.vkubeviewer.com",
    version = "v1",
    kind = "NodeInfo",
    namespaced,
    status = "NodeInfoStatus",
    printcolumn = r#"{"name":"VM","type":"string","jsonPath":".spec.nodename"}"#,
    printcolumn = r#"{"name":"Power","type":"string","jsonPath":".status.vmPowerState"}"#,
    printcolumn = r#"{"name":"IP","type":"string","jsonPath":".status.vmIpAddress"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfoSpec {
    /// Virtual machine name, matched exactly
    pub nodename: String,
}

/// Observed virtual machine state. Every field is rewritten on each sync.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfoStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_guest_id: Option<String>,

    /// Number of virtual CPUs
    #[serde(rename = "vmTotalCPU", default, skip_serializing_if = "Option::is_none")]
    pub vm_total_cpu: Option<i64>,

    /// CPU reservation (MHz)
    #[serde(rename = "vmResvdCPU", default, skip_serializing_if = "Option::is_none")]
    pub vm_resvd_cpu: Option<i64>,

    /// Configured memory (MB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_total_mem: Option<i64>,

    /// Memory reservation (MB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_resvd_mem: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_power_state: Option<String>,

    /// Virtual hardware version, e.g. "vmx-19"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_hw_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_ip_address: Option<String>,

    /// Datastore path of the .vmx file
    #[serde(rename = "pathToVM", default, skip_serializing_if = "Option::is_none")]
    pub path_to_vm: Option<String>,

    /// "Standard" or "Distributed"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_overall_status: Option<String>,

    /// Only set for distributed portgroups with a single VLAN id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
}
