//! metal3.io network CRD definitions
//!
//! Kubernetes Custom Resource Definitions consumed and produced by the
//! bare-metal network controller:
//! - `HostNetworkAttachment`: switchport policy (mode, VLANs, MTU)
//! - `BareMetalHost`: the subset of the host resource describing declared
//!   network interfaces, discovered NICs and applied configuration
//! - `BareMetalSwitch`: a top-of-rack switch managed by an external agent

pub mod baremetal_host;
pub mod baremetal_switch;
pub mod conditions;
pub mod host_network_attachment;
pub mod references;
pub mod validation;

pub use baremetal_host::*;
pub use baremetal_switch::*;
pub use conditions::*;
pub use host_network_attachment::*;
pub use references::*;
pub use validation::*;

/// API group shared by all CRDs in this crate.
pub const API_GROUP: &str = "metal3.io";
