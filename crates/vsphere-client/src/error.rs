//! vSphere client errors

use thiserror::Error;

/// Errors that can occur when talking to vCenter
#[derive(Debug, Error)]
pub enum VSphereError {
    /// HTTP request/response error (includes unreachable endpoints)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// vCenter returned a fault or an unexpected status
    #[error("vSphere API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Login rejected, or the session is no longer valid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The configured endpoint cannot be turned into a vCenter URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Managed object or view not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A polymorphic payload carried a type tag no extractor is registered for
    #[error("Unknown {kind} variant: {tag}")]
    UnknownVariant {
        /// What was being resolved (e.g. "network binding", "VLAN spec")
        kind: &'static str,
        /// The type discriminator that was found
        tag: String,
    },

    /// A required property was missing or had an unexpected shape
    #[error("Missing or malformed property '{path}' on {object}")]
    MissingProperty {
        /// Managed object the property was read from
        object: String,
        /// Property path
        path: String,
    },
}

impl VSphereError {
    /// Session establishment failures (bad endpoint, rejected credentials).
    pub fn is_auth(&self) -> bool {
        matches!(self, VSphereError::Authentication(_) | VSphereError::InvalidEndpoint(_))
    }

    pub fn is_unknown_variant(&self) -> bool {
        matches!(self, VSphereError::UnknownVariant { .. })
    }

    pub(crate) fn missing(object: impl std::fmt::Display, path: impl Into<String>) -> Self {
        VSphereError::MissingProperty {
            object: object.to_string(),
            path: path.into(),
        }
    }
}
