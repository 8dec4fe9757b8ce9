//! VSphereClient trait for mocking
//!
//! This trait abstracts the vCenter calls the accessor and the network
//! resolver are built on, so both can run against `MockVSphereClient` in
//! unit tests. Implementations must tolerate concurrent calls: one client
//! is shared by every reconciliation in the process.

use crate::error::VSphereError;
use crate::models::*;

/// Trait for vCenter inventory operations
///
/// All methods are read-style; none of them changes session state.
#[async_trait::async_trait]
pub trait VSphereClientTrait: Send + Sync {
    /// Endpoint this client is bound to (for logging)
    fn endpoint(&self) -> &str;

    // Container views
    async fn create_container_view(&self, managed_type: &str) -> Result<ManagedObjectReference, VSphereError>;
    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VSphereError>;

    /// Retrieves `properties` for every member of `view`, following continuation tokens.
    async fn retrieve_view_contents(
        &self,
        view: &ManagedObjectReference,
        managed_type: &str,
        properties: &[&str],
    ) -> Result<Vec<ObjectContent>, VSphereError>;

    /// Retrieves `properties` of a single managed object.
    async fn retrieve_properties(
        &self,
        object: &ManagedObjectReference,
        properties: &[&str],
    ) -> Result<PropertyBag, VSphereError>;

    // First-class disks
    async fn list_storage_objects(&self, datastore: &ManagedObjectReference) -> Result<Vec<String>, VSphereError>;
    async fn retrieve_storage_object(
        &self,
        id: &str,
        datastore: &ManagedObjectReference,
    ) -> Result<serde_json::Value, VSphereError>;
}
