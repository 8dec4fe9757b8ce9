//! Mock VSphereClient for unit testing
//!
//! In-memory implementation of `VSphereClientTrait` so the accessor, the
//! network resolver and the controllers can be tested without a vCenter.
//! It tracks open container views so tests can assert that none leak, and
//! supports failure injection and artificial retrieval latency.

use crate::error::VSphereError;
use crate::models::*;
use crate::vsphere_trait::VSphereClientTrait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock VSphereClient for testing
#[derive(Clone)]
pub struct MockVSphereClient {
    pub(crate) endpoint: String,
    // View membership, in insertion order
    pub(crate) members: Arc<Mutex<Vec<ManagedObjectReference>>>,
    pub(crate) properties: Arc<Mutex<HashMap<ManagedObjectReference, PropertyBag>>>,
    pub(crate) storage_objects: Arc<Mutex<Vec<(ManagedObjectReference, Value)>>>,
    pub(crate) open_views: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) destroyed_views: Arc<Mutex<usize>>,
    pub(crate) retrieval_failure: Arc<Mutex<Option<String>>>,
    pub(crate) retrieval_delay: Arc<Mutex<Option<Duration>>>,
    pub(crate) property_requests: Arc<Mutex<Vec<(ManagedObjectReference, Vec<String>)>>>,
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl Default for MockVSphereClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVSphereClient {
    pub fn new() -> Self {
        Self {
            endpoint: "https://mock-vcenter/sdk".to_string(),
            members: Arc::new(Mutex::new(Vec::new())),
            properties: Arc::new(Mutex::new(HashMap::new())),
            storage_objects: Arc::new(Mutex::new(Vec::new())),
            open_views: Arc::new(Mutex::new(HashMap::new())),
            destroyed_views: Arc::new(Mutex::new(0)),
            retrieval_failure: Arc::new(Mutex::new(None)),
            retrieval_delay: Arc::new(Mutex::new(None)),
            property_requests: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add an inventory object reachable through container views of its type
    pub fn add_object<'a>(
        &self,
        reference: ManagedObjectReference,
        properties: impl IntoIterator<Item = (&'a str, Value)>,
    ) {
        self.set_properties(reference.clone(), properties);
        let mut members = self.members.lock().unwrap();
        if !members.contains(&reference) {
            members.push(reference);
        }
    }

    /// Set (replace) the properties of an object, e.g. a network referenced by a VM
    pub fn set_properties<'a>(
        &self,
        reference: ManagedObjectReference,
        properties: impl IntoIterator<Item = (&'a str, Value)>,
    ) {
        let mut bag = PropertyBag::new();
        for (path, value) in properties {
            bag.insert(path, value);
        }
        self.properties.lock().unwrap().insert(reference, bag);
    }

    /// Add a first-class disk on `datastore` (raw `VStorageObject` JSON)
    pub fn add_storage_object(&self, datastore: &ManagedObjectReference, object: Value) {
        self.storage_objects.lock().unwrap().push((datastore.clone(), object));
    }

    /// Make every property retrieval fail with an API error
    pub fn fail_retrievals(&self, message: impl Into<String>) {
        *self.retrieval_failure.lock().unwrap() = Some(message.into());
    }

    /// Delay bulk view retrievals (for deadline tests)
    pub fn delay_retrievals(&self, delay: Duration) {
        *self.retrieval_delay.lock().unwrap() = Some(delay);
    }

    /// Container views created and not yet destroyed
    pub fn open_view_count(&self) -> usize {
        self.open_views.lock().unwrap().len()
    }

    pub fn destroyed_view_count(&self) -> usize {
        *self.destroyed_views.lock().unwrap()
    }

    /// Single-object property requests seen so far: (object, requested paths)
    pub fn property_requests(&self) -> Vec<(ManagedObjectReference, Vec<String>)> {
        self.property_requests.lock().unwrap().clone()
    }

    pub(crate) fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }

    fn check_failure(&self) -> Result<(), VSphereError> {
        match self.retrieval_failure.lock().unwrap().clone() {
            Some(message) => Err(VSphereError::Api(message)),
            None => Ok(()),
        }
    }

    /// Selects `paths` the way the property collector reports them, with
    /// primitives and arrays boxed as `anyType`.
    fn select(bag: &PropertyBag, paths: &[&str]) -> Vec<DynamicProperty> {
        paths
            .iter()
            .filter_map(|path| {
                bag.lookup(path).map(|val| DynamicProperty {
                    name: path.to_string(),
                    val: boxed(val.clone()),
                })
            })
            .collect()
    }
}

fn boxed(value: Value) -> Value {
    let type_name = match &value {
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "double",
        Value::Number(_) => "long",
        Value::Array(items) if items.iter().all(|i| i.get("type").is_some() && i.get("value").is_some()) => {
            "ArrayOfManagedObjectReference"
        }
        Value::Array(_) => "ArrayOfAnyType",
        Value::Object(_) | Value::Null => return value,
    };
    serde_json::json!({"_typeName": type_name, "_value": value})
}

#[async_trait::async_trait]
impl VSphereClientTrait for MockVSphereClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create_container_view(&self, managed_type: &str) -> Result<ManagedObjectReference, VSphereError> {
        let id = format!("session[mock]{}", self.next_id());
        self.open_views
            .lock()
            .unwrap()
            .insert(id.clone(), managed_type.to_string());
        Ok(ManagedObjectReference::new("ContainerView", id))
    }

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VSphereError> {
        match self.open_views.lock().unwrap().remove(&view.value) {
            Some(_) => {
                *self.destroyed_views.lock().unwrap() += 1;
                Ok(())
            }
            None => Err(VSphereError::NotFound(view.to_string())),
        }
    }

    async fn retrieve_view_contents(
        &self,
        view: &ManagedObjectReference,
        managed_type: &str,
        properties: &[&str],
    ) -> Result<Vec<ObjectContent>, VSphereError> {
        if !self.open_views.lock().unwrap().contains_key(&view.value) {
            return Err(VSphereError::NotFound(view.to_string()));
        }

        let delay = *self.retrieval_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;

        let members = self.members.lock().unwrap().clone();
        let bags = self.properties.lock().unwrap();
        Ok(members
            .into_iter()
            .filter(|m| m.kind == managed_type)
            .map(|obj| {
                let prop_set = bags
                    .get(&obj)
                    .map(|bag| Self::select(bag, properties))
                    .unwrap_or_default();
                ObjectContent {
                    obj,
                    prop_set,
                    missing_set: Vec::new(),
                }
            })
            .collect())
    }

    async fn retrieve_properties(
        &self,
        object: &ManagedObjectReference,
        properties: &[&str],
    ) -> Result<PropertyBag, VSphereError> {
        self.property_requests.lock().unwrap().push((
            object.clone(),
            properties.iter().map(|p| p.to_string()).collect(),
        ));
        self.check_failure()?;

        let prop_set = {
            let bags = self.properties.lock().unwrap();
            let bag = bags
                .get(object)
                .ok_or_else(|| VSphereError::NotFound(object.to_string()))?;
            Self::select(bag, properties)
        };

        let content = ObjectContent {
            obj: object.clone(),
            prop_set,
            missing_set: Vec::new(),
        };
        let (_, bag) = content.into_properties()?;
        Ok(bag)
    }

    async fn list_storage_objects(&self, datastore: &ManagedObjectReference) -> Result<Vec<String>, VSphereError> {
        self.check_failure()?;
        Ok(self
            .storage_objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(ds, _)| ds == datastore)
            .filter_map(|(_, raw)| raw.pointer("/config/id/id").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    async fn retrieve_storage_object(
        &self,
        id: &str,
        datastore: &ManagedObjectReference,
    ) -> Result<Value, VSphereError> {
        self.check_failure()?;
        self.storage_objects
            .lock()
            .unwrap()
            .iter()
            .find(|(ds, raw)| ds == datastore && raw.pointer("/config/id/id").and_then(Value::as_str) == Some(id))
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| VSphereError::NotFound(format!("VStorageObject {} on {}", id, datastore)))
    }
}
