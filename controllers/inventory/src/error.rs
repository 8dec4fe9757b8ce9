//! Controller-specific error types.
//!
//! Errors from the vSphere client and the Kubernetes API are wrapped as-is;
//! the remaining variants cover configuration, status mapping and the
//! per-cycle deadline.

use kube::Error as KubeError;
use thiserror::Error;
use vsphere_client::VSphereError;

/// Errors that can occur in the inventory controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error (including a failed status commit)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// vSphere session, retrieval or network resolution error
    #[error("vSphere error: {0}")]
    VSphere(#[from] VSphereError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A property needed for the status mapping was missing or mistyped
    #[error("Cannot map '{path}' of {object}: {reason}")]
    FieldExtraction {
        object: String,
        path: String,
        reason: String,
    },

    /// Reconcile exceeded its deadline
    #[error("Reconcile timed out: {0}")]
    Timeout(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    pub(crate) fn field(object: &str, path: &str, reason: impl Into<String>) -> Self {
        ControllerError::FieldExtraction {
            object: object.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
