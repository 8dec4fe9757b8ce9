//! Typed property extraction for status mappings.
//!
//! Required fields must be present with the expected JSON type. Optional
//! fields may be absent, but a present value of the wrong type is still an
//! error: a mistyped property means the mapping no longer matches the
//! inventory's shape.

use crate::error::ControllerError;
use serde_json::Value;
use vsphere_client::InventoryObject;

pub(crate) struct Fields<'a> {
    object: &'a InventoryObject,
}

impl<'a> Fields<'a> {
    pub(crate) fn of(object: &'a InventoryObject) -> Self {
        Self { object }
    }

    fn missing(&self, path: &str) -> ControllerError {
        ControllerError::field(&self.object.name, path, "missing")
    }

    fn mistyped(&self, path: &str, expected: &str, found: &Value) -> ControllerError {
        ControllerError::field(&self.object.name, path, format!("expected {}, found {}", expected, found))
    }

    pub(crate) fn value(&self, path: &str) -> Option<&'a Value> {
        self.object.properties.lookup(path)
    }

    pub(crate) fn optional_i64(&self, path: &str) -> Result<Option<i64>, ControllerError> {
        match self.value(path) {
            None => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(|| self.mistyped(path, "integer", v)),
        }
    }

    pub(crate) fn required_i64(&self, path: &str) -> Result<i64, ControllerError> {
        self.optional_i64(path)?.ok_or_else(|| self.missing(path))
    }

    pub(crate) fn optional_str(&self, path: &str) -> Result<Option<&'a str>, ControllerError> {
        match self.value(path) {
            None => Ok(None),
            Some(v) => v.as_str().map(Some).ok_or_else(|| self.mistyped(path, "string", v)),
        }
    }

    pub(crate) fn required_str(&self, path: &str) -> Result<&'a str, ControllerError> {
        self.optional_str(path)?.ok_or_else(|| self.missing(path))
    }

    pub(crate) fn optional_bool(&self, path: &str) -> Result<Option<bool>, ControllerError> {
        match self.value(path) {
            None => Ok(None),
            Some(v) => v.as_bool().map(Some).ok_or_else(|| self.mistyped(path, "boolean", v)),
        }
    }

    pub(crate) fn required_bool(&self, path: &str) -> Result<bool, ControllerError> {
        self.optional_bool(path)?.ok_or_else(|| self.missing(path))
    }

    /// Length of an optional array property (0 when absent).
    pub(crate) fn array_len(&self, path: &str) -> Result<usize, ControllerError> {
        match self.value(path) {
            None => Ok(0),
            Some(v) => v.as_array().map(Vec::len).ok_or_else(|| self.mistyped(path, "array", v)),
        }
    }
}
