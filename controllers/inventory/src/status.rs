//! Status records and the status store.
//!
//! A [`StatusRecord`] is the complete derived status of one resource. It
//! is committed as a merge patch that names every field of the kind, with
//! `null` for fields the record does not carry, so each commit replaces the
//! previous status instead of merging into it.

use crate::error::ControllerError;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams};
use kube::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Scalar status value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatusValue {
    Int(i64),
    Str(String),
}

impl From<i64> for StatusValue {
    fn from(value: i64) -> Self {
        StatusValue::Int(value)
    }
}

impl From<u32> for StatusValue {
    fn from(value: u32) -> Self {
        StatusValue::Int(i64::from(value))
    }
}

impl From<String> for StatusValue {
    fn from(value: String) -> Self {
        StatusValue::Str(value)
    }
}

impl From<&str> for StatusValue {
    fn from(value: &str) -> Self {
        StatusValue::Str(value.to_string())
    }
}

impl From<bool> for StatusValue {
    fn from(value: bool) -> Self {
        StatusValue::Str(value.to_string())
    }
}

/// Field name to value, keyed by the status field's wire name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    fields: BTreeMap<&'static str, StatusValue>,
}

impl StatusRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &'static str, value: impl Into<StatusValue>) {
        self.fields.insert(field, value.into());
    }

    /// Sets `field` when `value` is present, clears it otherwise.
    pub fn set_opt<V: Into<StatusValue>>(&mut self, field: &'static str, value: Option<V>) {
        match value {
            Some(value) => self.set(field, value),
            None => self.remove(field),
        }
    }

    pub fn remove(&mut self, field: &str) {
        self.fields.remove(field);
    }

    pub fn get(&self, field: &str) -> Option<&StatusValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `{"status": {...}}` naming every field in `fields`.
    pub fn to_status_patch(&self, fields: &[&'static str]) -> Value {
        let status: Map<String, Value> = fields
            .iter()
            .map(|field| {
                let value = self
                    .fields
                    .get(field)
                    .map_or(Value::Null, |v| serde_json::to_value(v).unwrap_or(Value::Null));
                (field.to_string(), value)
            })
            .collect();
        serde_json::json!({ "status": status })
    }
}

/// Identifies the resource whose status is written
#[derive(Debug, Clone)]
pub struct StatusTarget {
    pub kind: String,
    pub resource: ApiResource,
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for StatusTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Writes status subtrees
#[async_trait::async_trait]
pub trait StatusStore: Send + Sync {
    async fn commit(&self, target: &StatusTarget, patch: &Value) -> Result<(), ControllerError>;
}

/// Status store backed by the Kubernetes API (`patch_status` with a merge patch)
#[derive(Clone)]
pub struct KubeStatusStore {
    client: Client,
}

impl KubeStatusStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl StatusStore for KubeStatusStore {
    async fn commit(&self, target: &StatusTarget, patch: &Value) -> Result<(), ControllerError> {
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), &target.namespace, &target.resource);
        let pp = PatchParams::default();
        api.patch_status(&target.name, &pp, &Patch::Merge(patch)).await?;
        debug!("Committed status of {}", target);
        Ok(())
    }
}
