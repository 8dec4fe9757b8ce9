//! Scoped container views
//!
//! A `ContainerView` is a server-side handle; vCenter keeps it alive until
//! `DestroyView` is called or the session ends. [`ContainerView`] owns one
//! handle and guarantees it is destroyed on every exit path: explicitly via
//! [`ContainerView::release`], or from `Drop` when the owning future returns
//! early or is cancelled.

use crate::error::VSphereError;
use crate::models::ManagedObjectReference;
use crate::vsphere_trait::VSphereClientTrait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ContainerView {
    client: Arc<dyn VSphereClientTrait>,
    reference: ManagedObjectReference,
    released: bool,
}

impl ContainerView {
    /// Creates a recursive view of `managed_type` rooted at the root folder.
    pub async fn create(client: Arc<dyn VSphereClientTrait>, managed_type: &str) -> Result<Self, VSphereError> {
        let reference = client.create_container_view(managed_type).await?;
        Ok(Self {
            client,
            reference,
            released: false,
        })
    }

    pub fn reference(&self) -> &ManagedObjectReference {
        &self.reference
    }

    /// Destroys the view and reports the outcome.
    pub async fn release(mut self) -> Result<(), VSphereError> {
        let result = self.client.destroy_view(&self.reference).await;
        self.released = true;
        result
    }
}

impl Drop for ContainerView {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let client = self.client.clone();
        let reference = self.reference.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Container view {} dropped unreleased; destroying in background", reference);
                handle.spawn(async move {
                    if let Err(e) = client.destroy_view(&reference).await {
                        warn!("Failed to destroy container view {}: {}", reference, e);
                    }
                });
            }
            Err(_) => warn!(
                "Container view {} dropped outside a runtime; it lives until the session ends",
                reference
            ),
        }
    }
}

impl std::fmt::Debug for ContainerView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerView")
            .field("reference", &self.reference)
            .field("released", &self.released)
            .finish()
    }
}
