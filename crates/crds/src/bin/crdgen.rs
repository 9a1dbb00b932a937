//! Prints the CRD manifests owned by this repository as a YAML stream.
//!
//! BareMetalHost is not emitted: its definition belongs to the bare-metal
//! operator and the type here only models a subset of it.

use crds::{BareMetalSwitch, HostNetworkAttachment};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let documents = [HostNetworkAttachment::crd(), BareMetalSwitch::crd()];
    for crd in documents {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
