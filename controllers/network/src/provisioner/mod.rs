//! Ironic provisioning of host ports.
//!
//! The reconcilers decide *what* each NIC's switch port should look like;
//! this module pushes that state into Ironic port records and enrolls nodes.
//!
//! - `ports`: per-NIC port creation and divergence patching
//! - `register`: node enrollment and driver-info refresh

pub mod ports;
pub mod register;

pub use register::{NodeRegistration, RegisterOutcome};

#[cfg(test)]
mod ports_test;

use crds::{BareMetalHost, HardwareDetails, HostNetworkAttachmentSpec, SwitchportMode};
use ironic_client::IronicClientTrait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Resolved switch-port settings for one NIC, as stored in the port's
/// `extra.switchport` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPortConfig {
    /// Switchport mode
    pub mode: SwitchportMode,
    /// Untagged VLAN; 0 means none
    pub native_vlan: i32,
    /// Tagged VLANs, order preserved
    pub allowed_vlans: Vec<i32>,
    /// Port MTU
    pub mtu: Option<i32>,
}

impl SwitchPortConfig {
    /// JSON payload written to `extra.switchport`.
    ///
    /// `native_vlan` is omitted when 0, `allowed_vlans` when empty and `mtu` when unset.
    pub fn to_switchport_value(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("mode".to_string(), json!(self.mode.as_str()));
        if self.native_vlan != 0 {
            payload.insert("native_vlan".to_string(), json!(self.native_vlan));
        }
        if !self.allowed_vlans.is_empty() {
            payload.insert("allowed_vlans".to_string(), json!(self.allowed_vlans));
        }
        if let Some(mtu) = self.mtu {
            payload.insert("mtu".to_string(), json!(mtu));
        }
        Value::Object(payload)
    }
}

impl From<&HostNetworkAttachmentSpec> for SwitchPortConfig {
    fn from(spec: &HostNetworkAttachmentSpec) -> Self {
        Self {
            mode: spec.mode.clone(),
            native_vlan: spec.native_vlan,
            allowed_vlans: spec.allowed_vlans.clone(),
            mtu: spec.mtu,
        }
    }
}

/// Port provisioning for a single host against an Ironic backend.
///
/// Switch-port configurations are keyed by lowercased NIC name or MAC.
pub struct PortProvisioner<'a> {
    ironic: &'a dyn IronicClientTrait,
    host_key: String,
    boot_mac: Option<String>,
    hardware: Option<&'a HardwareDetails>,
    switch_port_configs: HashMap<String, SwitchPortConfig>,
}

impl<'a> PortProvisioner<'a> {
    /// Build a provisioner for `host` with the resolved per-interface configs.
    pub fn new(
        ironic: &'a dyn IronicClientTrait,
        host: &'a BareMetalHost,
        switch_port_configs: HashMap<String, SwitchPortConfig>,
    ) -> Self {
        let host_key = format!(
            "{}/{}",
            host.namespace_or_default(),
            host.metadata.name.as_deref().unwrap_or("<unknown>")
        );
        let switch_port_configs = switch_port_configs
            .into_iter()
            .map(|(key, config)| (key.to_lowercase(), config))
            .collect();
        Self {
            ironic,
            host_key,
            boot_mac: host
                .spec
                .boot_mac_address
                .clone()
                .filter(|mac| !mac.is_empty()),
            hardware: host.hardware_details(),
            switch_port_configs,
        }
    }
}
