//! vSphere API models
//!
//! These models match the VI/JSON wire shapes of the vim25 data objects
//! the inventory controllers read. Polymorphic payloads carry a
//! `_typeName` discriminator which is preserved in raw `serde_json::Value`s.

use crate::error::VSphereError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Reference to a managed object (`{type, value}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Request-body form, including the `_typeName` discriminator vCenter expects.
    pub fn to_wire(&self) -> Value {
        serde_json::json!({
            "_typeName": "ManagedObjectReference",
            "type": self.kind,
            "value": self.value,
        })
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Subset of `ServiceContent` used by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub about: AboutInfo,
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub view_manager: Option<ManagedObjectReference>,
    pub session_manager: Option<ManagedObjectReference>,
    pub v_storage_object_manager: Option<ManagedObjectReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub full_name: String,
    pub api_version: String,
    #[serde(default)]
    pub instance_uuid: Option<String>,
}

/// Currently authenticated user session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub key: String,
    pub user_name: String,
}

/// One property value returned by the property collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicProperty {
    pub name: String,
    #[serde(default)]
    pub val: Value,
}

/// A property the collector could not read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingProperty {
    pub path: String,
    #[serde(default)]
    pub fault: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectContent {
    pub obj: ManagedObjectReference,
    #[serde(default)]
    pub prop_set: Vec<DynamicProperty>,
    #[serde(default)]
    pub missing_set: Vec<MissingProperty>,
}

impl ObjectContent {
    /// Converts into a property bag; any reported missing property fails the object.
    pub fn into_properties(self) -> Result<(ManagedObjectReference, PropertyBag), VSphereError> {
        if !self.missing_set.is_empty() {
            let paths: Vec<&str> = self.missing_set.iter().map(|m| m.path.as_str()).collect();
            return Err(VSphereError::Api(format!(
                "property retrieval for {} reported faults on: {}",
                self.obj,
                paths.join(", ")
            )));
        }

        let mut bag = PropertyBag::new();
        for prop in self.prop_set {
            bag.insert(prop.name, unbox_any(prop.val));
        }
        Ok((self.obj, bag))
    }
}

/// Unwraps a boxed `anyType` value.
///
/// `DynamicProperty.val` is declared as `anyType`, so the property collector
/// sends primitives, enums and arrays as `{"_typeName": "string", "_value": ...}`.
/// Data objects arrive unboxed and are returned unchanged.
pub fn unbox_any(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("_value") && map.get("_typeName").is_some_and(Value::is_string) => {
            map.remove("_value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// `RetrievePropertiesEx` / `ContinueRetrievePropertiesEx` page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrieveResult {
    #[serde(default)]
    pub objects: Vec<ObjectContent>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Property values of one managed object, keyed by property path.
///
/// Lookups accept dotted paths (`summary.config.numCpu`) and descend into
/// nested data objects when only a prefix was retrieved. JSON `null`
/// is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(serde_json::Map<String, Value>);

impl PropertyBag {
    pub fn new() -> Self {
        Self(serde_json::Map::new())
    }

    pub fn insert(&mut self, path: impl Into<String>, value: Value) {
        self.0.insert(path.into(), value);
    }

    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value).filter(|v| !v.is_null());
        }

        let mut end = path.len();
        while let Some(idx) = path[..end].rfind('.') {
            if let Some(root) = self.0.get(&path[..idx]) {
                return descend(root, &path[idx + 1..]);
            }
            end = idx;
        }
        None
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, Value>> for PropertyBag {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }
}

fn descend<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

/// Inventory object kinds the controllers mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryKind {
    VirtualMachine,
    HostSystem,
    Datastore,
    /// First-class disks (`VStorageObject`), enumerated per datastore
    FirstClassDisk,
}

impl InventoryKind {
    /// Managed type the container view is created for.
    pub fn managed_type(&self) -> &'static str {
        match self {
            InventoryKind::VirtualMachine => "VirtualMachine",
            InventoryKind::HostSystem => "HostSystem",
            InventoryKind::Datastore | InventoryKind::FirstClassDisk => "Datastore",
        }
    }

    /// Properties retrieved for every member of the view.
    pub fn property_paths(&self) -> &'static [&'static str] {
        match self {
            InventoryKind::VirtualMachine => &["name", "summary", "network"],
            InventoryKind::HostSystem => &["name", "summary"],
            InventoryKind::Datastore => &["name", "summary", "overallStatus", "host"],
            InventoryKind::FirstClassDisk => &["name"],
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryKind::FirstClassDisk => f.write_str("VStorageObject"),
            other => f.write_str(other.managed_type()),
        }
    }
}

/// One retrieved inventory object
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryObject {
    pub reference: ManagedObjectReference,
    pub name: String,
    pub properties: PropertyBag,
}

impl InventoryObject {
    /// Builds an object from collector output; the `name` property is required.
    pub fn from_content(content: ObjectContent) -> Result<Self, VSphereError> {
        let (reference, properties) = content.into_properties()?;
        let name = properties
            .lookup("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| VSphereError::missing(&reference, "name"))?;

        Ok(Self {
            reference,
            name,
            properties,
        })
    }

    /// Builds an object from a `VStorageObject` found on `datastore`.
    ///
    /// The disk's `config` is kept as-is and the owning datastore's name is
    /// recorded under `datastoreName`.
    pub fn from_storage_object(raw: Value, datastore: &InventoryObject) -> Result<Self, VSphereError> {
        let id = raw
            .pointer("/config/id/id")
            .and_then(Value::as_str)
            .ok_or_else(|| VSphereError::missing(&datastore.reference, "config.id.id"))?
            .to_string();
        let reference = ManagedObjectReference::new("VStorageObject", id);
        let name = raw
            .pointer("/config/name")
            .and_then(Value::as_str)
            .ok_or_else(|| VSphereError::missing(&reference, "config.name"))?
            .to_string();

        let mut properties = PropertyBag::new();
        properties.insert("name", Value::String(name.clone()));
        properties.insert("config", raw.get("config").cloned().unwrap_or(Value::Null));
        properties.insert("datastoreName", Value::String(datastore.name.clone()));

        Ok(Self {
            reference,
            name,
            properties,
        })
    }
}

/// Point-in-time result of one bulk retrieval, in the order vCenter returned it
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryObjectSet {
    pub kind: InventoryKind,
    objects: Vec<InventoryObject>,
}

impl InventoryObjectSet {
    pub fn new(kind: InventoryKind, objects: Vec<InventoryObject>) -> Self {
        Self { kind, objects }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InventoryObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<'a> IntoIterator for &'a InventoryObjectSet {
    type Item = &'a InventoryObject;
    type IntoIter = std::slice::Iter<'a, InventoryObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}
