//! Network binding resolution
//!
//! A VM's `network` property lists references whose concrete kind is only
//! known from the reference's type tag. Resolution is table-driven: each
//! recognized tag names the properties to fetch and the extractor that
//! turns them into a [`NetworkBinding`]. Tags with no table entry fail with
//! `UnknownVariant` instead of being skipped.
//!
//! Distributed portgroups carry a second-level variant in
//! `config.defaultPortConfig.vlan`; only the single VLAN id spec is mapped.
//! Trunk and private VLAN specs fail closed the same way.

use crate::error::VSphereError;
use crate::models::{ManagedObjectReference, PropertyBag};
use crate::vsphere_trait::VSphereClientTrait;
use serde_json::Value;
use tracing::debug;

const TYPE_TAG: &str = "_typeName";
const PORT_CONFIG_PATH: &str = "config.defaultPortConfig";
const VMWARE_PORT_SETTING: &str = "VMwareDVSPortSetting";

/// Resolved network binding of one VM network reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkBinding {
    /// Standard vSwitch portgroup (`Network`)
    Standard { name: String, overall_status: String },
    /// Distributed portgroup with a single VLAN id
    Distributed {
        name: String,
        overall_status: String,
        vlan_id: u32,
    },
}

impl NetworkBinding {
    pub fn switch_type(&self) -> &'static str {
        match self {
            NetworkBinding::Standard { .. } => "Standard",
            NetworkBinding::Distributed { .. } => "Distributed",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NetworkBinding::Standard { name, .. } | NetworkBinding::Distributed { name, .. } => name,
        }
    }

    pub fn overall_status(&self) -> &str {
        match self {
            NetworkBinding::Standard { overall_status, .. }
            | NetworkBinding::Distributed { overall_status, .. } => overall_status,
        }
    }

    pub fn vlan_id(&self) -> Option<u32> {
        match self {
            NetworkBinding::Standard { .. } => None,
            NetworkBinding::Distributed { vlan_id, .. } => Some(*vlan_id),
        }
    }
}

type BindingExtractor = fn(&ManagedObjectReference, &PropertyBag) -> Result<NetworkBinding, VSphereError>;

struct BindingVariant {
    kind: &'static str,
    properties: &'static [&'static str],
    extract: BindingExtractor,
}

const BINDING_VARIANTS: &[BindingVariant] = &[
    BindingVariant {
        kind: "Network",
        properties: &["name", "overallStatus"],
        extract: extract_standard,
    },
    BindingVariant {
        kind: "DistributedVirtualPortgroup",
        properties: &["name", "overallStatus", PORT_CONFIG_PATH],
        extract: extract_distributed,
    },
];

type VlanExtractor = fn(&ManagedObjectReference, &Value) -> Result<u32, VSphereError>;

struct VlanVariant {
    type_name: &'static str,
    extract: VlanExtractor,
}

const VLAN_VARIANTS: &[VlanVariant] = &[VlanVariant {
    type_name: "VmwareDistributedVirtualSwitchVlanIdSpec",
    extract: extract_single_vlan,
}];

/// Resolves one network reference into its binding.
///
/// Only the properties listed for the reference's kind are fetched, so a
/// standard network is never asked for port configuration.
pub async fn resolve(
    client: &dyn VSphereClientTrait,
    reference: &ManagedObjectReference,
) -> Result<NetworkBinding, VSphereError> {
    let variant = BINDING_VARIANTS
        .iter()
        .find(|v| v.kind == reference.kind)
        .ok_or_else(|| VSphereError::UnknownVariant {
            kind: "network binding",
            tag: reference.kind.clone(),
        })?;

    debug!("Resolving {} binding {}", variant.kind, reference);
    let properties = client.retrieve_properties(reference, variant.properties).await?;
    (variant.extract)(reference, &properties)
}

fn required_str(reference: &ManagedObjectReference, bag: &PropertyBag, path: &str) -> Result<String, VSphereError> {
    bag.lookup(path)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VSphereError::missing(reference, path))
}

fn extract_standard(reference: &ManagedObjectReference, bag: &PropertyBag) -> Result<NetworkBinding, VSphereError> {
    Ok(NetworkBinding::Standard {
        name: required_str(reference, bag, "name")?,
        overall_status: required_str(reference, bag, "overallStatus")?,
    })
}

fn extract_distributed(reference: &ManagedObjectReference, bag: &PropertyBag) -> Result<NetworkBinding, VSphereError> {
    let name = required_str(reference, bag, "name")?;
    let overall_status = required_str(reference, bag, "overallStatus")?;

    let port_config = bag
        .lookup(PORT_CONFIG_PATH)
        .ok_or_else(|| VSphereError::missing(reference, PORT_CONFIG_PATH))?;
    let setting = type_tag(reference, port_config, PORT_CONFIG_PATH)?;
    if setting != VMWARE_PORT_SETTING {
        return Err(VSphereError::UnknownVariant {
            kind: "port setting",
            tag: setting.to_string(),
        });
    }

    let vlan_path = format!("{}.vlan", PORT_CONFIG_PATH);
    let vlan = port_config
        .get("vlan")
        .filter(|v| !v.is_null())
        .ok_or_else(|| VSphereError::missing(reference, vlan_path.clone()))?;
    let tag = type_tag(reference, vlan, &vlan_path)?;
    let variant = VLAN_VARIANTS
        .iter()
        .find(|v| v.type_name == tag)
        .ok_or_else(|| VSphereError::UnknownVariant {
            kind: "VLAN spec",
            tag: tag.to_string(),
        })?;

    Ok(NetworkBinding::Distributed {
        name,
        overall_status,
        vlan_id: (variant.extract)(reference, vlan)?,
    })
}

fn type_tag<'a>(reference: &ManagedObjectReference, value: &'a Value, path: &str) -> Result<&'a str, VSphereError> {
    value
        .get(TYPE_TAG)
        .and_then(Value::as_str)
        .ok_or_else(|| VSphereError::missing(reference, format!("{}.{}", path, TYPE_TAG)))
}

fn extract_single_vlan(reference: &ManagedObjectReference, vlan: &Value) -> Result<u32, VSphereError> {
    vlan.get("vlanId")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| VSphereError::missing(reference, format!("{}.vlan.vlanId", PORT_CONFIG_PATH)))
}
