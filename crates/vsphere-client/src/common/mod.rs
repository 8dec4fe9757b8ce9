//! Common utilities for the vSphere client
//!
//! Provides the authenticated HTTP wrapper shared by all VI/JSON calls.

use crate::error::VSphereError;
use crate::models::ManagedObjectReference;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Header carrying the VI/JSON session token
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// HTTP client wrapper bound to one vim25 API base URL
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    session_id: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    ///
    /// `base_url` is the vim25 root, e.g. `https://vc/sdk/vim25/8.0.1.0`.
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: None,
        }
    }

    /// Returns a copy that sends `session_id` on every request.
    pub fn authenticated(&self, session_id: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session_id: Some(session_id),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Path of a method invoked on a managed object: `/{type}/{moid}/{method}`.
    pub fn method_path(object: &ManagedObjectReference, method: &str) -> String {
        format!(
            "/{}/{}/{}",
            object.kind,
            urlencoding::encode(&object.value),
            method
        )
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Accept", "application/json");
        match &self.session_id {
            Some(id) => builder.header(SESSION_HEADER, id),
            None => builder,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, VSphereError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(VSphereError::Http)?;

        Self::decode(path, response).await
    }

    /// POST a JSON body and return the raw response (after status checks).
    pub async fn post_raw(&self, path: &str, body: &serde_json::Value) -> Result<Response, VSphereError> {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self
            .request(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(VSphereError::Http)?;

        Self::check_status(path, response).await
    }

    /// POST a JSON body; `None` when vCenter answers with no content.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Option<T>, VSphereError> {
        let response = self.post_raw(path, body).await?;
        Self::read_body(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<Option<T>, VSphereError> {
        let response = Self::check_status(path, response).await?;
        Self::read_body(path, response).await
    }

    async fn check_status(path: &str, response: Response) -> Result<Response, VSphereError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(500).collect();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(VSphereError::Authentication(
                format!("{} rejected: {} - {}", path, status, body),
            )),
            StatusCode::NOT_FOUND => Err(VSphereError::NotFound(format!("{} - {}", path, body))),
            _ => Err(VSphereError::Api(format!("{} failed: {} - {}", path, status, body))),
        }
    }

    async fn read_body<T: DeserializeOwned>(path: &str, response: Response) -> Result<Option<T>, VSphereError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response.text().await?;
        if text.trim().is_empty() || text.trim() == "null" {
            return Ok(None);
        }

        serde_json::from_str(&text).map(Some).map_err(|e| {
            VSphereError::Api(format!(
                "error decoding response body of {}: {} - Response (first 500 chars): {}",
                path,
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }
}
