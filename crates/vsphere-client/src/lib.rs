//! vSphere Inventory Client
//!
//! A Rust client for reading live inventory from vCenter through the
//! VI/JSON API (`/sdk/vim25/{release}/...`).
//! Provides an authenticated session, bulk property retrieval over
//! server-side container views, and resolution of polymorphic network
//! bindings.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vsphere_client::{accessor, Credentials, Endpoint, InventoryKind, SessionOptions, VSphereClient, VSphereClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = Endpoint::parse("https://vcenter.example.com/sdk")?;
//! let credentials = Credentials::new("administrator@vsphere.local", "secret");
//! let client = VSphereClient::establish(&endpoint, &credentials, &SessionOptions::default()).await?;
//! let client: Arc<dyn VSphereClientTrait> = Arc::new(client);
//!
//! // Point-in-time snapshot of every virtual machine
//! let vms = accessor::list_all(&client, InventoryKind::VirtualMachine).await?;
//! for vm in vms.iter() {
//!     println!("{}", vm.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Session**: login with a reusable, optionally persisted session cache
//! - **Accessor**: scoped container views that are always destroyed
//! - **Network resolver**: table-driven standard/distributed binding resolution
//! - **Mocking**: in-memory `MockVSphereClient` behind the `test-util` feature

pub mod accessor;
pub mod client;
pub mod common;
pub mod error;
pub mod models;
pub mod network;
pub mod session;
#[path = "trait.rs"]
pub mod vsphere_trait;
pub mod view;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
#[cfg(test)]
pub(crate) mod test_server;

pub use client::VSphereClient;
pub use common::HttpClient;
pub use error::VSphereError;
pub use models::*;
pub use network::NetworkBinding;
pub use session::{Credentials, Endpoint, SessionCache, SessionOptions};
pub use view::ContainerView;
pub use vsphere_trait::VSphereClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockVSphereClient;
