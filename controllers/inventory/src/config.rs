//! Controller configuration
//!
//! Everything is read once from the process environment at startup.

use crate::error::ControllerError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use vsphere_client::session::DEFAULT_API_RELEASE;
use vsphere_client::{Credentials, SessionCache, SessionOptions};

const DEFAULT_REQUEUE_SECS: u64 = 60;
const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Config {
    /// vCenter URL or bare host (`GOVMOMI_URL`)
    pub vsphere_url: String,
    pub credentials: Credentials,
    /// Skip TLS verification (`GOVMOMI_INSECURE`)
    pub insecure: bool,
    pub api_release: String,
    /// Directory for the persisted session cache (`GOVMOMI_SESSION_CACHE_DIR`)
    pub session_cache_dir: Option<PathBuf>,
    /// `WATCH_NAMESPACE`; all namespaces when unset
    pub namespace: Option<String>,
    pub requeue_interval: Duration,
    pub reconcile_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{} environment variable is required", key))
            })
        };

        let vsphere_url = required("GOVMOMI_URL")?;
        let username = required("GOVMOMI_USERNAME")?;
        // Passwords may legitimately contain surrounding whitespace
        let password = lookup("GOVMOMI_PASSWORD")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig("GOVMOMI_PASSWORD environment variable is required".to_string())
            })?;

        let insecure = match get("GOVMOMI_INSECURE") {
            Some(raw) => parse_bool("GOVMOMI_INSECURE", &raw)?,
            None => true,
        };

        Ok(Self {
            vsphere_url,
            credentials: Credentials::new(username, password),
            insecure,
            api_release: get("VSPHERE_API_RELEASE").unwrap_or_else(|| DEFAULT_API_RELEASE.to_string()),
            session_cache_dir: get("GOVMOMI_SESSION_CACHE_DIR").map(PathBuf::from),
            namespace: get("WATCH_NAMESPACE"),
            requeue_interval: parse_secs("REQUEUE_INTERVAL_SECS", get("REQUEUE_INTERVAL_SECS"), DEFAULT_REQUEUE_SECS)?,
            reconcile_timeout: parse_secs(
                "RECONCILE_TIMEOUT_SECS",
                get("RECONCILE_TIMEOUT_SECS"),
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            insecure: self.insecure,
            api_release: self.api_release.clone(),
            cache: match &self.session_cache_dir {
                Some(dir) => SessionCache::persistent(dir),
                None => SessionCache::in_memory(),
            },
            ..SessionOptions::default()
        }
    }

    pub fn log_summary(&self) {
        info!("Configuration:");
        info!("  vSphere URL: {}", self.vsphere_url);
        info!("  vSphere user: {}", self.credentials.username);
        info!("  Insecure TLS: {}", self.insecure);
        info!("  API release: {}", self.api_release);
        info!(
            "  Session cache: {}",
            self.session_cache_dir
                .as_ref()
                .map_or_else(|| "in-memory".to_string(), |d| d.display().to_string())
        );
        info!("  Namespace: {}", self.namespace.as_deref().unwrap_or("all namespaces"));
        info!("  Requeue interval: {}s", self.requeue_interval.as_secs());
        info!("  Reconcile timeout: {}s", self.reconcile_timeout.as_secs());
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ControllerError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ControllerError::InvalidConfig(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}

fn parse_secs(key: &str, raw: Option<String>, default: u64) -> Result<Duration, ControllerError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, raw
        ))),
    }
}
