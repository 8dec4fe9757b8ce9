//! Prints the topology CRD manifests as multi-document YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crds.yaml`

use crds::{DatastoreInfo, FCDInfo, HostInfo, NodeInfo};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [NodeInfo::crd(), HostInfo::crd(), DatastoreInfo::crd(), FCDInfo::crd()];

    for crd in &crds {
        println!("---");
        print!("{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
