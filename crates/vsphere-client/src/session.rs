//! Inventory session establishment
//!
//! One authenticated session is established per process at startup and
//! then shared (read-only) by every reconciliation. Login material is kept
//! in a [`SessionCache`] keyed by `user@host`, optionally persisted to disk
//! so a restarted process can pick up a still-valid session instead of
//! logging in again.
//!
//! There is no re-login after startup: an expired session surfaces as an
//! `Authentication` error from the retrieval that hit it.

use crate::client::VSphereClient;
use crate::common::{HttpClient, SESSION_HEADER};
use crate::error::VSphereError;
use crate::models::{ManagedObjectReference, ServiceContent, UserSession};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default vim25 release used in VI/JSON paths
pub const DEFAULT_API_RELEASE: &str = "8.0.1.0";

/// A normalized vCenter endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parse an endpoint such as `https://vc.example.com/sdk`, `vc.example.com`
    /// or `https://10.0.0.5:8443`.
    ///
    /// A bare host is promoted to `https://host/sdk`. Any user info embedded
    /// in the URL is dropped; credentials are supplied separately.
    pub fn parse(raw: &str) -> Result<Self, VSphereError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VSphereError::InvalidEndpoint("endpoint is empty".to_string()));
        }

        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };

        let mut url = Url::parse(&with_scheme)
            .map_err(|e| VSphereError::InvalidEndpoint(format!("{}: {}", raw, e)))?;

        if !matches!(url.scheme(), "https" | "http") {
            return Err(VSphereError::InvalidEndpoint(format!(
                "{}: unsupported scheme '{}'",
                raw,
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(VSphereError::InvalidEndpoint(format!("{}: missing host", raw)));
        }
        if url.path().is_empty() || url.path() == "/" {
            url.set_path("/sdk");
        }
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self { url })
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    fn authority(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    /// vim25 root for VI/JSON calls, e.g. `https://vc/sdk/vim25/8.0.1.0`.
    pub fn api_base(&self, release: &str) -> String {
        format!("{}://{}/sdk/vim25/{}", self.url.scheme(), self.authority(), release)
    }

    /// Session cache key for `username` on this endpoint.
    pub fn cache_key(&self, username: &str) -> String {
        format!("{}@{}", username, self.authority())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Login credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cached login material for one `user@host`
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
}

impl CachedSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            issued_at: Utc::now(),
        }
    }
}

impl fmt::Debug for CachedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSession")
            .field("session_id", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Session cache keyed by `user@host`
///
/// Cache I/O problems never fail a login; they are logged and the cache is
/// bypassed.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    entries: Arc<Mutex<HashMap<String, CachedSession>>>,
    directory: Option<PathBuf>,
}

impl SessionCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache that also persists entries as JSON files under `directory`.
    pub fn persistent(directory: impl Into<PathBuf>) -> Self {
        Self {
            entries: Arc::default(),
            directory: Some(directory.into()),
        }
    }

    pub async fn load(&self, key: &str) -> Option<CachedSession> {
        let hit = self
            .entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned());
        if hit.is_some() {
            return hit;
        }

        let path = self.file_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read session cache {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<CachedSession>(&bytes) {
            Ok(session) => {
                if let Ok(mut entries) = self.entries.lock() {
                    entries.insert(key.to_string(), session.clone());
                }
                Some(session)
            }
            Err(e) => {
                warn!("Ignoring unreadable session cache {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn store(&self, key: &str, session: CachedSession) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), session.clone());
        }

        let Some(path) = self.file_for(key) else {
            return;
        };
        if let Err(e) = write_private(&path, &session).await {
            warn!("Failed to persist session cache {}: {}", path.display(), e);
        }
    }

    pub async fn evict(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }

        if let Some(path) = self.file_for(key) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove session cache {}: {}", path.display(), e),
            }
        }
    }

    fn file_for(&self, key: &str) -> Option<PathBuf> {
        self.directory
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", sanitize_key(key))))
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn write_private(path: &std::path::Path, session: &CachedSession) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec(session)?;
    tokio::fs::write(path, bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(())
}

/// Connection options for [`VSphereClient::establish`]
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// vim25 release used in request paths
    pub api_release: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub cache: SessionCache,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            insecure: true,
            api_release: DEFAULT_API_RELEASE.to_string(),
            request_timeout: Duration::from_secs(30),
            cache: SessionCache::in_memory(),
        }
    }
}

impl VSphereClient {
    /// Establish the process-wide session.
    ///
    /// Every failure (malformed or unreachable endpoint, rejected
    /// credentials) is reported as an authentication error. Nothing is
    /// retried here.
    pub async fn establish(
        endpoint: &Endpoint,
        credentials: &Credentials,
        options: &SessionOptions,
    ) -> Result<Self, VSphereError> {
        Self::connect(endpoint, credentials, options)
            .await
            .map_err(|e| {
                if e.is_auth() {
                    e
                } else {
                    VSphereError::Authentication(format!(
                        "cannot establish session with {}: {}",
                        endpoint, e
                    ))
                }
            })
    }

    async fn connect(
        endpoint: &Endpoint,
        credentials: &Credentials,
        options: &SessionOptions,
    ) -> Result<Self, VSphereError> {
        let http_client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(options.insecure)
            .build()?;
        let http = HttpClient::new(http_client, endpoint.api_base(&options.api_release));

        debug!("Fetching service content from {}", http.base_url());
        let content: ServiceContent = http
            .get("/ServiceInstance/ServiceInstance/content")
            .await?
            .ok_or_else(|| VSphereError::Api("empty service content".to_string()))?;
        info!("Connected to {} (API {})", content.about.full_name, content.about.api_version);

        let session_manager = content.session_manager.clone().ok_or_else(|| {
            VSphereError::Authentication(format!("{} exposes no session manager", endpoint))
        })?;

        let key = endpoint.cache_key(&credentials.username);
        if let Some(cached) = options.cache.load(&key).await {
            let candidate = http.authenticated(cached.session_id.clone());
            match current_session(&candidate, &session_manager).await {
                Ok(Some(session)) => {
                    info!(
                        "Reusing cached vSphere session for {} (issued {})",
                        session.user_name, cached.issued_at
                    );
                    return Ok(Self::from_parts(candidate, content, endpoint.to_string()));
                }
                Ok(None) => debug!("Cached session for {} has expired", key),
                Err(e) => debug!("Cached session for {} could not be validated: {}", key, e),
            }
            options.cache.evict(&key).await;
        }

        let session_id = login(&http, &session_manager, credentials).await?;
        options.cache.store(&key, CachedSession::new(session_id.clone())).await;
        info!("Logged in to {} as {}", endpoint.host(), credentials.username);

        Ok(Self::from_parts(
            http.authenticated(session_id),
            content,
            endpoint.to_string(),
        ))
    }
}

async fn login(
    http: &HttpClient,
    session_manager: &ManagedObjectReference,
    credentials: &Credentials,
) -> Result<String, VSphereError> {
    let body = serde_json::json!({
        "userName": credentials.username,
        "password": credentials.password,
    });
    let response = http
        .post_raw(&HttpClient::method_path(session_manager, "Login"), &body)
        .await
        .map_err(|e| match e {
            // vCenter reports InvalidLogin as a fault body, not a 401
            VSphereError::Api(msg) => VSphereError::Authentication(msg),
            other => other,
        })?;

    response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| VSphereError::Authentication("login response carried no session id".to_string()))
}

async fn current_session(
    http: &HttpClient,
    session_manager: &ManagedObjectReference,
) -> Result<Option<UserSession>, VSphereError> {
    let path = HttpClient::method_path(session_manager, "currentSession");
    match http.get::<UserSession>(&path).await {
        Ok(session) => Ok(session),
        Err(VSphereError::Authentication(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
