//! Inventory Controller
//!
//! Mirrors live vSphere inventory into the status of four namespaced
//! resource kinds:
//! - NodeInfo: a virtual machine and its network binding
//! - HostInfo: an ESXi host
//! - DatastoreInfo: a datastore
//! - FCDInfo: a first-class disk backing a persistent volume
//!
//! Each resource is re-synchronized on a fixed poll interval.

mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
mod status;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Inventory Controller");

    let config = Config::from_env()?;
    config.log_summary();

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
