//! vSphere VI/JSON client
//!
//! Implements the small slice of the vim25 API the inventory controllers
//! need: container views, the property collector, and the vStorage object
//! manager for first-class disks.

use crate::common::HttpClient;
use crate::error::VSphereError;
use crate::models::*;
use crate::vsphere_trait::VSphereClientTrait;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Upper bound on continuation pages followed for one retrieval
const MAX_RETRIEVE_PAGES: usize = 10_000;

/// Authenticated vCenter client
///
/// Built by [`VSphereClient::establish`]. The session token is immutable for
/// the lifetime of the client, so it can be shared freely across tasks.
pub struct VSphereClient {
    http: HttpClient,
    content: ServiceContent,
    endpoint: String,
}

impl std::fmt::Debug for VSphereClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VSphereClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl VSphereClient {
    pub(crate) fn from_parts(http: HttpClient, content: ServiceContent, endpoint: String) -> Self {
        Self {
            http,
            content,
            endpoint,
        }
    }

    fn view_manager(&self) -> Result<&ManagedObjectReference, VSphereError> {
        self.content
            .view_manager
            .as_ref()
            .ok_or_else(|| VSphereError::Api(format!("{} exposes no view manager", self.endpoint)))
    }

    fn storage_object_manager(&self) -> Result<&ManagedObjectReference, VSphereError> {
        self.content.v_storage_object_manager.as_ref().ok_or_else(|| {
            VSphereError::Api(format!("{} exposes no vStorage object manager", self.endpoint))
        })
    }

    async fn retrieve_all(&self, spec_set: Value) -> Result<Vec<ObjectContent>, VSphereError> {
        let collector = &self.content.property_collector;
        let body = json!({
            "specSet": [spec_set],
            "options": {"_typeName": "RetrieveOptions"},
        });

        let mut page: Option<RetrieveResult> = self
            .http
            .post(&HttpClient::method_path(collector, "RetrievePropertiesEx"), &body)
            .await?;

        let mut pending = PendingPages {
            http: self.http.clone(),
            collector: collector.clone(),
            token: None,
        };
        let mut objects = Vec::new();
        let mut pages = 0;
        while let Some(result) = page {
            objects.extend(result.objects);
            pages += 1;

            pending.token = result.token;
            let Some(token) = pending.token.clone() else {
                break;
            };
            if pages >= MAX_RETRIEVE_PAGES {
                pending.cancel().await;
                return Err(VSphereError::Api(format!(
                    "retrieval did not finish after {} pages",
                    pages
                )));
            }
            debug!("Continuing retrieval (page {})", pages + 1);
            page = match self
                .http
                .post(
                    &HttpClient::method_path(collector, "ContinueRetrievePropertiesEx"),
                    &json!({ "token": token }),
                )
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    pending.cancel().await;
                    return Err(e);
                }
            };
        }

        // An empty continuation body ends the result set
        pending.token = None;
        Ok(objects)
    }
}

/// Continuation token of a retrieval that was not read to the end.
///
/// The property collector holds the remaining pages until the token is
/// cancelled or the session ends. Abandoned retrievals cancel it, from
/// `Drop` when the owning future is cancelled (e.g. by a deadline).
struct PendingPages {
    http: HttpClient,
    collector: ManagedObjectReference,
    token: Option<String>,
}

impl PendingPages {
    async fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            cancel_retrieval(&self.http, &self.collector, &token).await;
        }
    }
}

impl Drop for PendingPages {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let http = self.http.clone();
                let collector = self.collector.clone();
                handle.spawn(async move { cancel_retrieval(&http, &collector, &token).await });
            }
            Err(_) => warn!("Retrieval {} abandoned outside a runtime; left to expire", token),
        }
    }
}

async fn cancel_retrieval(http: &HttpClient, collector: &ManagedObjectReference, token: &str) {
    let path = HttpClient::method_path(collector, "CancelRetrievePropertiesEx");
    match http.post_raw(&path, &json!({ "token": token })).await {
        Ok(_) => debug!("Cancelled retrieval {}", token),
        Err(e) => warn!("Failed to cancel retrieval {}: {}", token, e),
    }
}

fn property_spec(managed_type: &str, properties: &[&str]) -> Value {
    json!({
        "_typeName": "PropertySpec",
        "type": managed_type,
        "pathSet": properties,
    })
}

#[async_trait::async_trait]
impl VSphereClientTrait for VSphereClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create_container_view(&self, managed_type: &str) -> Result<ManagedObjectReference, VSphereError> {
        let body = json!({
            "container": self.content.root_folder.to_wire(),
            "type": [managed_type],
            "recursive": true,
        });
        let view: Option<ManagedObjectReference> = self
            .http
            .post(&HttpClient::method_path(self.view_manager()?, "CreateContainerView"), &body)
            .await?;

        let view = view.ok_or_else(|| {
            VSphereError::Api(format!("CreateContainerView for {} returned no view", managed_type))
        })?;
        debug!("Created container view {} for {}", view, managed_type);
        Ok(view)
    }

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VSphereError> {
        self.http
            .post_raw(&HttpClient::method_path(view, "DestroyView"), &json!({}))
            .await?;
        debug!("Destroyed container view {}", view);
        Ok(())
    }

    async fn retrieve_view_contents(
        &self,
        view: &ManagedObjectReference,
        managed_type: &str,
        properties: &[&str],
    ) -> Result<Vec<ObjectContent>, VSphereError> {
        let spec = json!({
            "_typeName": "PropertyFilterSpec",
            "propSet": [property_spec(managed_type, properties)],
            "objectSet": [{
                "_typeName": "ObjectSpec",
                "obj": view.to_wire(),
                "skip": true,
                "selectSet": [{
                    "_typeName": "TraversalSpec",
                    "name": "traverseEntities",
                    "type": "ContainerView",
                    "path": "view",
                    "skip": false,
                }],
            }],
        });
        self.retrieve_all(spec).await
    }

    async fn retrieve_properties(
        &self,
        object: &ManagedObjectReference,
        properties: &[&str],
    ) -> Result<PropertyBag, VSphereError> {
        let spec = json!({
            "_typeName": "PropertyFilterSpec",
            "propSet": [property_spec(&object.kind, properties)],
            "objectSet": [{
                "_typeName": "ObjectSpec",
                "obj": object.to_wire(),
                "skip": false,
            }],
        });

        let content = self
            .retrieve_all(spec)
            .await?
            .into_iter()
            .find(|c| c.obj == *object)
            .ok_or_else(|| VSphereError::NotFound(object.to_string()))?;
        let (_, bag) = content.into_properties()?;
        Ok(bag)
    }

    async fn list_storage_objects(&self, datastore: &ManagedObjectReference) -> Result<Vec<String>, VSphereError> {
        let ids: Option<Vec<Value>> = self
            .http
            .post(
                &HttpClient::method_path(self.storage_object_manager()?, "ListVStorageObject"),
                &json!({ "datastore": datastore.to_wire() }),
            )
            .await?;

        ids.unwrap_or_default()
            .into_iter()
            .map(|id| {
                id.get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| VSphereError::missing(datastore, "ListVStorageObject[].id"))
            })
            .collect()
    }

    async fn retrieve_storage_object(
        &self,
        id: &str,
        datastore: &ManagedObjectReference,
    ) -> Result<Value, VSphereError> {
        let body = json!({
            "id": {"_typeName": "ID", "id": id},
            "datastore": datastore.to_wire(),
        });
        self.http
            .post(
                &HttpClient::method_path(self.storage_object_manager()?, "RetrieveVStorageObject"),
                &body,
            )
            .await?
            .ok_or_else(|| VSphereError::NotFound(format!("VStorageObject {} on {}", id, datastore)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{service_content_json, Canned, TestServer};
    use std::time::Duration;

    fn client_for(server: &TestServer) -> VSphereClient {
        let content: ServiceContent = serde_json::from_value(service_content_json()).unwrap();
        VSphereClient::from_parts(
            server.http().authenticated("session-1".to_string()),
            content,
            server.endpoint().to_string(),
        )
    }

    fn vm_page(names: &[&str], token: Option<&str>) -> Value {
        let objects: Vec<Value> = names
            .iter()
            .map(|name| {
                json!({
                    "obj": {"type": "VirtualMachine", "value": format!("vm-{}", name)},
                    "propSet": [{"name": "name", "val": {"_typeName": "string", "_value": name}}],
                })
            })
            .collect();
        match token {
            Some(token) => json!({"_typeName": "RetrieveResult", "objects": objects, "token": token}),
            None => json!({"_typeName": "RetrieveResult", "objects": objects}),
        }
    }

    fn view() -> ManagedObjectReference {
        ManagedObjectReference::new("ContainerView", "session[52d0]5a1b")
    }

    #[test]
    fn test_property_spec_shape() {
        let spec = property_spec("VirtualMachine", &["name", "summary"]);
        assert_eq!(spec["type"], "VirtualMachine");
        assert_eq!(spec["pathSet"], json!(["name", "summary"]));
        assert_eq!(spec["_typeName"], "PropertySpec");
    }

    #[test]
    fn test_retrieve_result_page_decodes() {
        let page: RetrieveResult = serde_json::from_value(json!({
            "_typeName": "RetrieveResult",
            "objects": [{"obj": {"type": "HostSystem", "value": "host-1"}, "propSet": []}],
            "token": "1"
        }))
        .unwrap();
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.token.as_deref(), Some("1"));

        let last: RetrieveResult = serde_json::from_value(json!({"objects": []})).unwrap();
        assert!(last.token.is_none());
    }

    #[tokio::test]
    async fn test_retrieval_follows_continuation_pages() {
        let server = TestServer::start(|req| match req.vim_method() {
            "RetrievePropertiesEx" => Canned::json(200, vm_page(&["a"], Some("tok-1"))),
            "ContinueRetrievePropertiesEx" => Canned::json(200, vm_page(&["b"], None)),
            _ => Canned::json(500, json!({"_typeName": "InvalidRequest"})),
        })
        .await;
        let client = client_for(&server);

        let contents = client.retrieve_view_contents(&view(), "VirtualMachine", &["name"]).await.unwrap();

        assert_eq!(contents.len(), 2);
        assert_eq!(server.calls("ContinueRetrievePropertiesEx")[0].json()["token"], "tok-1");
        assert!(server.calls("CancelRetrievePropertiesEx").is_empty());
        assert_eq!(server.calls("RetrievePropertiesEx")[0].header("vmware-api-session-id"), Some("session-1"));
    }

    #[tokio::test]
    async fn test_failed_continuation_cancels_token() {
        let server = TestServer::start(|req| match req.vim_method() {
            "RetrievePropertiesEx" => Canned::json(200, vm_page(&["a"], Some("tok-1"))),
            "ContinueRetrievePropertiesEx" => Canned::json(500, json!({"_typeName": "SystemError"})),
            "CancelRetrievePropertiesEx" => Canned::empty(200),
            _ => Canned::json(500, json!({"_typeName": "InvalidRequest"})),
        })
        .await;
        let client = client_for(&server);

        let err = client.retrieve_view_contents(&view(), "VirtualMachine", &["name"]).await.unwrap_err();

        assert!(matches!(err, VSphereError::Api(_)));
        let cancels = server.calls("CancelRetrievePropertiesEx");
        assert_eq!(cancels.len(), 1);
        assert_eq!(cancels[0].json()["token"], "tok-1");
        assert_eq!(cancels[0].path, "/sdk/vim25/8.0.1.0/PropertyCollector/propertyCollector/CancelRetrievePropertiesEx");
    }

    #[tokio::test]
    async fn test_abandoned_retrieval_cancels_token() {
        let server = TestServer::start(|req| match req.vim_method() {
            "RetrievePropertiesEx" => Canned::json(200, vm_page(&["a"], Some("tok-7"))),
            "ContinueRetrievePropertiesEx" => {
                Canned::json(200, vm_page(&["b"], None)).delayed(Duration::from_secs(5))
            }
            "CancelRetrievePropertiesEx" => Canned::empty(200),
            _ => Canned::json(500, json!({"_typeName": "InvalidRequest"})),
        })
        .await;
        let client = client_for(&server);

        let result = tokio::time::timeout(
            Duration::from_millis(300),
            client.retrieve_view_contents(&view(), "VirtualMachine", &["name"]),
        )
        .await;
        assert!(result.is_err(), "retrieval should have hit the deadline");

        let mut cancels = Vec::new();
        for _ in 0..100 {
            cancels = server.calls("CancelRetrievePropertiesEx");
            if !cancels.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(cancels.len(), 1);
        assert_eq!(cancels[0].json()["token"], "tok-7");
    }
}
