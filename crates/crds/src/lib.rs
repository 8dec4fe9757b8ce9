//! vkubeviewer CRD Definitions
//!
//! Kubernetes Custom Resource Definitions whose status mirrors vSphere
//! inventory. Specs only name the inventory object; all status fields are
//! derived by the inventory controller.

pub mod node_info;
pub mod host_info;
pub mod datastore_info;
pub mod fcd_info;

pub use node_info::*;
pub use host_info::*;
pub use datastore_info::*;
pub use fcd_info::*;
