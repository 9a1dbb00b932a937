//! Network Controller library
//!
//! Reconciles the network configuration of bare-metal hosts:
//! - BareMetalHost: pushes per-NIC switch-port settings to Ironic ports
//! - BareMetalSwitch: renders switch driver configuration into secrets
//! - HostNetworkAttachment: admission webhook guarding referenced attachments
//!
//! The `network-controller` binary runs all of the above. The provisioner is
//! also usable on its own, e.g. by an enrollment tool that registers nodes
//! with `PortProvisioner::register_node` before the controller takes over.

pub mod backoff;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod error;
pub mod provisioner;
pub mod reconciler;
pub mod watcher;
pub mod webhook;

#[cfg(test)]
mod test_utils;

pub use provisioner::{NodeRegistration, PortProvisioner, RegisterOutcome, SwitchPortConfig};
